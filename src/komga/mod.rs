//! Komga sync (external, §4.10/§6). `client` is the typed HTTP surface;
//! `sync` drives the background loop; this module holds the pure
//! metadata-construction logic the loop and its tests share.

pub mod client;
pub mod sync;

pub use client::{Author, Book, BookMetadata, KomgaClient, Series, SeriesMetadataPatch};
pub use sync::KomgaSync;

use crate::entities::{comments, gallery, tags, times, times::TimeKind, titles};
use crate::errors::Result;
use crate::storage::StorageDriver;

/// Build the metadata Komga should show for `gallery_name`, or `None` if no
/// such gallery is known to the store. Mirrors the round-trip law in §8:
/// `title = parse(f).title`, `releaseDate = yyyy-MM-dd(upload_time)`,
/// `authors = {name, role}` for every tag with a non-empty value,
/// `summary = comment` (possibly empty).
pub fn get_komga_metadata(driver: &StorageDriver, gallery_name: &str) -> Result<Option<BookMetadata>> {
    let Some(db_gallery_id) = gallery::get_gallery_id_by_name(driver, gallery_name)? else {
        return Ok(None);
    };

    let title = titles::get_title(driver, db_gallery_id)?;
    let summary = comments::get_comment(driver, db_gallery_id)?;
    let upload_time = times::get_time(driver, TimeKind::Upload, db_gallery_id)?;
    let release_date = upload_time.format("%Y-%m-%d").to_string();

    let authors = tags::get_tag_pairs_for_gallery(driver, db_gallery_id)?
        .into_iter()
        .filter(|(_name, value)| !value.is_empty())
        .map(|(name, value)| Author { name: value, role: name })
        .collect();

    Ok(Some(BookMetadata {
        title,
        summary,
        release_date,
        authors,
    }))
}
