//! C9: the Orchestrator. Ties Scanner & GC, the Gallery Ingestor, the
//! Duplicate Analyzer, and the archive builder into one pass over the
//! download tree. The source's recursive self-call on "inserts occurred"
//! is converted to a plain return value (§9 Open Questions): `run_pass`
//! does exactly one pass and reports whether it inserted anything; the
//! sleep-and-repeat lives in the CLI entry points.

use crate::archive::{self, ArchiveOptions};
use crate::concurrency::WorkerPool;
use crate::config::{AppConfig, CbzSort};
use crate::duplicates;
use crate::entities::times::{reset_stale_redownload_times, TimeKind};
use crate::entities::{gallery, times};
use crate::errors::Result;
use crate::gallery_info::{parse_gallery_info, GalleryInfo};
use crate::ingestion;
use crate::scanner;
use crate::storage::StorageDriver;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// §2's chunk unit: `100 * P` folders per batch.
const CHUNK_MULTIPLIER: usize = 100;

#[derive(Debug, Default, Clone, Copy)]
pub struct PassOutcome {
    pub galleries_inserted: usize,
    pub archives_written: usize,
}

impl PassOutcome {
    pub fn any_insert(&self) -> bool {
        self.galleries_inserted > 0
    }
}

/// One full pass: drain removals, scan the tree, ingest every chunk in
/// parallel, refresh orphan hashes, reset stale redownload times. Returns
/// whether anything was inserted, so the caller knows whether to loop
/// again.
pub async fn run_pass(
    driver: &Arc<StorageDriver>,
    config: &AppConfig,
    db_pool: &WorkerPool,
    enable_archiving: bool,
) -> Result<PassOutcome> {
    let drained = scanner::drain_pending_removals(driver)?;
    if drained > 0 {
        info!(count = drained, "drained pending gallery removals");
    }

    let (folders, names) = scanner::scan_current_galleries_folders(driver, &config.h2h.download_path)?;

    let cbz_path = config.h2h.cbz_path.as_ref().filter(|_| enable_archiving);

    if let Some(cbz_path) = cbz_path {
        let removed = scanner::refresh_current_cbz_files(cbz_path, &names)?;
        if removed > 0 {
            info!(count = removed, "pruned stale cbz archives");
        }
    }

    let ordered = sort_folders(folders, config.h2h.cbz_sort);

    let mut outcome = PassOutcome::default();
    for chunk in ordered.chunks(CHUNK_MULTIPLIER * db_pool.permits()) {
        let chunk = chunk.to_vec();
        let driver_for_chunk = driver.clone();
        let results = db_pool
            .run_all(chunk.clone(), move |folder| {
                let driver = driver_for_chunk.clone();
                async move {
                    tokio::task::spawn_blocking(move || ingestion::insert_gallery_info(&driver, &folder))
                        .await
                        .unwrap_or_else(|err| {
                            Err(crate::errors::H2hDbError::Config(format!(
                                "ingest task panicked: {err}"
                            )))
                        })
                }
            })
            .await;

        for result in &results {
            match result {
                Ok(true) => outcome.galleries_inserted += 1,
                Ok(false) => {}
                Err(err) => error!(error = %err, "gallery ingest failed, skipping"),
            }
        }

        if let Some(cbz_path) = cbz_path {
            outcome.archives_written += build_archives_for_chunk(driver, config, cbz_path, &chunk)?;
        }
    }

    let reclaimed = scanner::refresh_current_files_hashs(driver)?;
    if reclaimed > 0 {
        info!(count = reclaimed, "reclaimed orphan hash rows");
    }

    reset_stale_redownload_times(driver)?;

    Ok(outcome)
}

fn build_archives_for_chunk(
    driver: &StorageDriver,
    config: &AppConfig,
    cbz_path: &Path,
    chunk: &[PathBuf],
) -> Result<usize> {
    let exclude = duplicates::get_duplicated_hash_values(driver)?;
    let options = ArchiveOptions {
        output_dir: cbz_path.to_path_buf(),
        tmp_dir: config.h2h.cbz_tmp_directory.clone(),
        max_pixel: config.h2h.cbz_max_size,
        grouping: config.h2h.cbz_grouping.into(),
    };

    let mut written = 0;
    for folder in chunk {
        let name = match folder.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let Some(db_gallery_id) = gallery::get_gallery_id_by_name(driver, &name)? else {
            continue;
        };
        let upload_time = times::get_time(driver, TimeKind::Upload, db_gallery_id)?;
        if archive::compress_gallery_to_cbz(folder, &name, upload_time, &options, &exclude)? {
            written += 1;
        }
    }
    Ok(written)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Time(NaiveDateTime),
    Num(i64),
    Text(String),
    /// `|pages - zero_level|`, ascending rather than reversed like the others.
    PagesDistance(i64),
}

/// Order folders per `h2h.cbz_sort`, read straight off each gallery's
/// `galleryinfo.txt` so it applies even before the gallery has ever been
/// ingested. Folders that fail to parse sort last and keep their relative
/// order; `CbzSort::No` leaves discovery order untouched. `upload_time`,
/// `download_time`, `gid`, and `title` sort newest/largest-first; `pages`
/// sorts ascending by distance from its zero level (closest first).
fn sort_folders(folders: Vec<PathBuf>, sort: CbzSort) -> Vec<PathBuf> {
    if matches!(sort, CbzSort::No) {
        return folders;
    }

    let mut keyed: Vec<(Option<SortValue>, PathBuf)> = folders
        .into_iter()
        .map(|folder| {
            let key = parse_gallery_info(&folder).ok().map(|info| sort_value(&info, sort));
            (key, folder)
        })
        .collect();

    keyed.sort_by(|a, b| match (&a.0, &b.0) {
        (Some(SortValue::PagesDistance(a)), Some(SortValue::PagesDistance(b))) => a.cmp(b),
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    keyed.into_iter().map(|(_, folder)| folder).collect()
}

fn sort_value(info: &GalleryInfo, sort: CbzSort) -> SortValue {
    match sort {
        CbzSort::UploadTime => SortValue::Time(info.upload_time),
        CbzSort::DownloadTime => SortValue::Time(info.download_time),
        CbzSort::Gid => SortValue::Num(info.gid),
        CbzSort::Title => SortValue::Text(info.title.clone()),
        CbzSort::Pages { zero_level } => {
            SortValue::PagesDistance((info.file_names.len() as i64 - zero_level).abs())
        }
        CbzSort::No => unreachable!("filtered out before reaching sort_value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_gallery(dir: &Path, name: &str, upload_time: &str, pages: usize) -> PathBuf {
        let folder = dir.join(name);
        fs::create_dir_all(&folder).unwrap();
        fs::write(
            folder.join("galleryinfo.txt"),
            format!(
                "Title: {name}\n\
                 Upload Time: {upload_time}\n\
                 Uploaded By: someone\n\
                 Downloaded: {upload_time}\n\
                 Tags: artist:x\n\
                 Uploader's Comments\n"
            ),
        )
        .unwrap();
        for page in 0..pages {
            fs::write(folder.join(format!("{page}.jpg")), b"x").unwrap();
        }
        folder
    }

    #[test]
    fn sorting_by_upload_time_orders_newest_first() {
        let dir = tempdir().unwrap();
        let older = write_gallery(dir.path(), "Older [1]", "2020-01-01 00:00:00", 1);
        let newer = write_gallery(dir.path(), "Newer [2]", "2024-01-01 00:00:00", 1);

        let ordered = sort_folders(vec![older.clone(), newer.clone()], CbzSort::UploadTime);
        assert_eq!(ordered, vec![newer, older]);
    }

    #[test]
    fn sort_no_preserves_discovery_order() {
        let dir = tempdir().unwrap();
        let a = write_gallery(dir.path(), "A [1]", "2020-01-01 00:00:00", 1);
        let b = write_gallery(dir.path(), "B [2]", "2021-01-01 00:00:00", 1);

        let ordered = sort_folders(vec![a.clone(), b.clone()], CbzSort::No);
        assert_eq!(ordered, vec![a, b]);
    }

    #[test]
    fn sorting_by_pages_orders_ascending_by_distance_from_zero_level() {
        let dir = tempdir().unwrap();
        // zero_level 3: "Close" (4 pages, distance 1) should sort before
        // "Far" (10 pages, distance 7).
        let close = write_gallery(dir.path(), "Close [1]", "2020-01-01 00:00:00", 4);
        let far = write_gallery(dir.path(), "Far [2]", "2020-01-01 00:00:00", 10);

        let ordered = sort_folders(
            vec![far.clone(), close.clone()],
            CbzSort::Pages { zero_level: 3 },
        );
        assert_eq!(ordered, vec![close, far]);
    }

    #[test]
    fn sorting_by_bare_pages_centers_on_twenty() {
        let dir = tempdir().unwrap();
        // Bare "pages" defaults zero_level to 20: 19 pages (distance 1)
        // sorts before 1 page (distance 19).
        let near_twenty = write_gallery(dir.path(), "Near [1]", "2020-01-01 00:00:00", 19);
        let far_from_twenty = write_gallery(dir.path(), "Far [2]", "2020-01-01 00:00:00", 1);

        let ordered = sort_folders(
            vec![far_from_twenty.clone(), near_twenty.clone()],
            CbzSort::Pages { zero_level: 20 },
        );
        assert_eq!(ordered, vec![near_twenty, far_from_twenty]);
    }
}
