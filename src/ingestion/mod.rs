//! C6: the Gallery Ingestor. Turns one on-disk gallery folder into rows and
//! file hashes, using the `pending_gallery_removals` tombstone as the unit
//! of atomicity (§4.5) — the system's substitute for cross-statement
//! transactions.

use crate::entities::{comments, files, gallery, gids, queues, tags, times, titles, upload_accounts};
use crate::entities::times::TimeKind;
use crate::errors::Result;
use crate::gallery_info::{parse_gallery_info, GalleryInfo};
use crate::hashes;
use crate::storage::StorageDriver;
use sha2::{Digest, Sha512};
use std::path::Path;
use tracing::{info, warn};

/// `insert_gallery_info(folder)`: parse, tombstone, replace, re-hash,
/// re-tag, un-tombstone. Returns `true` iff work was actually done.
///
/// Error policy: any `?` below leaves the tombstone in place if it was
/// already written; the next scan's drain-pending-removals pass (§4.7)
/// cleans up the partial write before the folder is retried.
pub fn insert_gallery_info(driver: &StorageDriver, gallery_folder: &Path) -> Result<bool> {
    let info = parse_gallery_info(gallery_folder)?;

    if !content_has_changed(driver, &info)? {
        return Ok(false);
    }

    queues::add_tombstone(driver, &info.gallery_name)?;
    gallery::delete_gallery(driver, &info.gallery_name)?;

    let db_gallery_id = gallery::get_or_insert_gallery_id(driver, &info.gallery_name)?;

    gids::insert_gid(driver, db_gallery_id, info.gid)?;
    titles::insert_title(driver, db_gallery_id, &info.title)?;
    upload_accounts::insert_upload_account(driver, db_gallery_id, &info.upload_account)?;
    comments::insert_comment(driver, db_gallery_id, &info.comment)?;
    times::insert_time(driver, TimeKind::Upload, db_gallery_id, info.upload_time)?;
    times::insert_time(driver, TimeKind::Modified, db_gallery_id, info.modified_time)?;
    // download_time seeds access_time and redownload_time at ingest (§4.5 step 6).
    times::insert_time(driver, TimeKind::Download, db_gallery_id, info.download_time)?;
    times::insert_time(driver, TimeKind::Access, db_gallery_id, info.download_time)?;
    times::insert_time(driver, TimeKind::Redownload, db_gallery_id, info.download_time)?;

    for file_name in &info.file_names {
        let db_file_id = files::insert_file(driver, db_gallery_id, file_name)?;
        let bytes = std::fs::read(info.gallery_folder.join(file_name))?;
        let digests = hashes::digest_all(&bytes);
        hashes::register_file_hashes(driver, db_file_id, &digests)?;
    }

    tags::insert_tag_associations(driver, db_gallery_id, &info.tags)?;

    queues::remove_tombstone(driver, &info.gallery_name)?;
    info!(gallery = %info.gallery_name, gid = info.gid, "ingested gallery");
    Ok(true)
}

/// Mirrors §4.5 step 2: compare the stored sha512 of `galleryinfo.txt`
/// against its current on-disk digest. Absent gallery, absent file row, or
/// absent hash row all count as "changed" (nothing to compare against).
fn content_has_changed(driver: &StorageDriver, info: &GalleryInfo) -> Result<bool> {
    let Some(db_gallery_id) = gallery::get_gallery_id_by_name(driver, &info.gallery_name)? else {
        return Ok(true);
    };
    let Ok(db_file_id) = files::get_file_id(driver, db_gallery_id, "galleryinfo.txt") else {
        return Ok(true);
    };
    let Some(stored) = hashes::get_stored_sha512(driver, db_file_id)? else {
        return Ok(true);
    };

    let on_disk = std::fs::read(info.gallery_folder.join("galleryinfo.txt"))?;
    let current = Sha512::digest(&on_disk).to_vec();
    if current == stored {
        return Ok(false);
    }
    warn!(gallery = %info.gallery_name, "galleryinfo.txt changed since last ingest");
    Ok(true)
}
