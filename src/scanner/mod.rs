//! C8: Scanner & GC. Walks the download tree, reconciles it against the
//! database, drains the tombstone queue, reclaims orphan hash rows, and
//! prunes stale CBZ output.

use crate::entities::{gallery, queues};
use crate::errors::Result;
use crate::hashes::{reclaim_orphan_hashes, ALL_ALGORITHMS};
use crate::storage::{split_name, StorageDriver, ALL_TABLES as SCHEMA_TABLES};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

const TEMP_TABLE_BATCH_SIZE: usize = 5000;

/// One gallery folder found on disk.
#[derive(Debug, Clone)]
pub struct DiscoveredGallery {
    pub folder: PathBuf,
    pub name: String,
}

/// Walk `download_path`; every directory directly containing
/// `galleryinfo.txt` is a current gallery.
pub fn walk_download_tree(download_path: &Path) -> Vec<DiscoveredGallery> {
    WalkDir::new(download_path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| entry.path().join("galleryinfo.txt").is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            Some(DiscoveredGallery {
                folder: entry.into_path(),
                name,
            })
        })
        .collect()
}

/// §4.7 steps 1–3: walk the tree, stage it in a temp table, anti-join
/// against `galleries_dbids`, and tombstone whatever is in the DB but
/// absent on disk. Returns the discovered folders and their names.
pub fn scan_current_galleries_folders(
    driver: &StorageDriver,
    download_path: &Path,
) -> Result<(Vec<PathBuf>, Vec<String>)> {
    let discovered = walk_download_tree(download_path);

    let missing: Vec<String> = {
        let conn = driver.writer();
        conn.execute(
            "CREATE TEMP TABLE IF NOT EXISTS tmp_current_galleries (
                name_part1 TEXT NOT NULL,
                name_part2 TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute("DELETE FROM tmp_current_galleries", [])?;

        for batch in discovered.chunks(TEMP_TABLE_BATCH_SIZE) {
            for gallery in batch {
                let split = split_name(&gallery.name)?;
                conn.execute(
                    "INSERT INTO tmp_current_galleries (name_part1, name_part2) VALUES (?1, ?2)",
                    rusqlite::params![split.part_1, split.part_2],
                )?;
            }
        }

        let mut stmt = conn.prepare(
            "SELECT gallery_name_full FROM galleries_dbids g
             WHERE NOT EXISTS (
                 SELECT 1 FROM tmp_current_galleries t
                 WHERE t.name_part1 = g.gallery_name_part1 AND t.name_part2 = g.gallery_name_part2
             )",
        )?;
        stmt.query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
        // stmt and conn drop here, releasing the writer guard before add_tombstone re-locks it.
    };

    for name in &missing {
        queues::add_tombstone(driver, name)?;
    }

    let folders = discovered.iter().map(|g| g.folder.clone()).collect();
    let names = discovered.into_iter().map(|g| g.name).collect();
    Ok((folders, names))
}

/// §4.7 step 4: drain every tombstoned name — delete its row (cascading to
/// every child table) then the tombstone itself.
pub fn drain_pending_removals(driver: &StorageDriver) -> Result<usize> {
    let tombstoned = queues::list_tombstones(driver)?;
    for name in &tombstoned {
        gallery::delete_gallery(driver, name)?;
        queues::remove_tombstone(driver, name)?;
        info!(gallery = %name, "drained pending removal");
    }
    Ok(tombstoned.len())
}

/// Anti-join deletion of orphaned dictionary rows, run across all 11
/// algorithms in parallel.
pub fn refresh_current_files_hashs(driver: &StorageDriver) -> Result<usize> {
    let reclaimed: Result<Vec<usize>> = ALL_ALGORITHMS
        .par_iter()
        .map(|algorithm| reclaim_orphan_hashes(driver, *algorithm))
        .collect();
    Ok(reclaimed?.into_iter().sum())
}

/// §4.7's `_refresh_current_cbz_files`: remove any archive whose base name
/// (minus `.cbz`) is not a current gallery name, then iteratively prune
/// directories left empty by that removal.
pub fn refresh_current_cbz_files(cbz_path: &Path, current_names: &[String]) -> Result<usize> {
    if !cbz_path.is_dir() {
        return Ok(0);
    }
    let current: std::collections::HashSet<&str> =
        current_names.iter().map(|s| s.as_str()).collect();

    let mut removed = 0;
    for entry in WalkDir::new(cbz_path).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("cbz") {
            continue;
        }
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        if !current.contains(stem) {
            std::fs::remove_file(path)?;
            removed += 1;
        }
    }

    loop {
        let mut pruned_any = false;
        for entry in WalkDir::new(cbz_path)
            .contents_first(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.path() == cbz_path {
                continue;
            }
            if entry.file_type().is_dir() {
                if std::fs::read_dir(entry.path())
                    .map(|mut d| d.next().is_none())
                    .unwrap_or(false)
                {
                    if std::fs::remove_dir(entry.path()).is_ok() {
                        pruned_any = true;
                    }
                }
            }
        }
        if !pruned_any {
            break;
        }
    }

    Ok(removed)
}

/// The SQLite reinterpretation of the original's per-table `OPTIMIZE`:
/// `ANALYZE` every table a foreign key points at (the hot join targets),
/// then `PRAGMA optimize` for the query planner as a whole.
pub fn optimize_database(driver: &StorageDriver) -> Result<()> {
    let conn = driver.writer();
    let mut referenced_tables: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for table in SCHEMA_TABLES {
        for column in table.columns {
            if let Some(fk) = column.foreign_key {
                referenced_tables.insert(fk.foreign_table);
            }
        }
    }
    for table in referenced_tables {
        conn.execute(&format!("ANALYZE {table}"), [])?;
    }
    conn.execute("PRAGMA optimize", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::gallery::get_or_insert_gallery_id;
    use crate::storage::open_and_prepare;
    use std::fs;
    use tempfile::tempdir;

    fn fresh_driver() -> StorageDriver {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        driver
    }

    fn make_gallery(root: &Path, name: &str) {
        let folder = root.join(name);
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("galleryinfo.txt"), b"Title: x\n").unwrap();
    }

    #[test]
    fn walk_download_tree_finds_only_galleryinfo_folders() {
        let dir = tempdir().unwrap();
        make_gallery(dir.path(), "Gallery [1]");
        fs::create_dir_all(dir.path().join("not_a_gallery")).unwrap();

        let found = walk_download_tree(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Gallery [1]");
    }

    #[test]
    fn gallery_removed_from_disk_is_tombstoned_then_drained() {
        let dir = tempdir().unwrap();
        let driver = fresh_driver();
        get_or_insert_gallery_id(&driver, "Gone [1]").unwrap();

        let (_, names) = scan_current_galleries_folders(&driver, dir.path()).unwrap();
        assert!(names.is_empty());
        assert_eq!(
            queues::list_tombstones(&driver).unwrap(),
            vec!["Gone [1]".to_string()]
        );

        let drained = drain_pending_removals(&driver).unwrap();
        assert_eq!(drained, 1);
        assert!(gallery::get_gallery_id_by_name(&driver, "Gone [1]")
            .unwrap()
            .is_none());
    }

    #[test]
    fn galleries_present_on_disk_are_not_tombstoned() {
        let dir = tempdir().unwrap();
        let driver = fresh_driver();
        get_or_insert_gallery_id(&driver, "Staying [1]").unwrap();
        make_gallery(dir.path(), "Staying [1]");

        scan_current_galleries_folders(&driver, dir.path()).unwrap();
        assert!(queues::list_tombstones(&driver).unwrap().is_empty());
    }

    #[test]
    fn refresh_cbz_files_removes_archives_for_galleries_no_longer_current() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Stale.cbz"), b"x").unwrap();
        fs::write(dir.path().join("Current.cbz"), b"x").unwrap();

        let removed = refresh_current_cbz_files(dir.path(), &["Current".to_string()]).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("Stale.cbz").exists());
        assert!(dir.path().join("Current.cbz").exists());
    }
}
