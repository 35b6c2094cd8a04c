//! The `galleries_dbids` natural-key/surrogate-key mapping (I1) and the
//! cascading `delete_gallery` operation every other entity relies on.

use crate::errors::{H2hDbError, Result};
use crate::storage::{join_parts, split_name, StorageDriver};

/// Resolve `name`'s surrogate id, inserting a fresh row if it is not yet
/// known. Returns the id either way — this is the `getOrInsert` pattern the
/// design calls for around the dictionary tables, applied here to the
/// gallery natural key itself.
pub fn get_or_insert_gallery_id(driver: &StorageDriver, name: &str) -> Result<i64> {
    if let Some(id) = get_gallery_id_by_name(driver, name)? {
        return Ok(id);
    }
    let split = split_name(name)?;
    let conn = driver.writer();
    match conn.execute(
        "INSERT INTO galleries_dbids (gallery_name_part1, gallery_name_part2, gallery_name_full)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![split.part_1, split.part_2, name],
    ) {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(err) if H2hDbError::is_duplicate_key(&err) => {
            drop(conn);
            // Lost the race against a concurrent ingester; re-resolve.
            get_gallery_id_by_name(driver, name)?.ok_or(H2hDbError::NotFound)
        }
        Err(err) => Err(H2hDbError::Sqlite(err)),
    }
}

pub fn get_gallery_id_by_name(driver: &StorageDriver, name: &str) -> Result<Option<i64>> {
    let split = split_name(name)?;
    let conn = driver.reader();
    conn.query_row(
        "SELECT db_gallery_id FROM galleries_dbids
         WHERE gallery_name_part1 = ?1 AND gallery_name_part2 = ?2",
        rusqlite::params![split.part_1, split.part_2],
        |row| row.get(0),
    )
    .map(Some)
    .or_else(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(H2hDbError::Sqlite(other)),
    })
}

pub fn get_gallery_name_by_id(driver: &StorageDriver, db_gallery_id: i64) -> Result<String> {
    driver.query_row_or_not_found(
        "SELECT gallery_name_part1, gallery_name_part2 FROM galleries_dbids
         WHERE db_gallery_id = ?1",
        [db_gallery_id],
        |row| {
            let part_1: String = row.get(0)?;
            let part_2: String = row.get(1)?;
            Ok(join_parts(&part_1, &part_2))
        },
    )
}

/// Delete the gallery row (and, via `ON DELETE CASCADE`, every dependent
/// row) if it exists. Safe to call when absent — the ingestor's step 4
/// relies on this.
pub fn delete_gallery(driver: &StorageDriver, name: &str) -> Result<()> {
    let split = split_name(name)?;
    driver.writer().execute(
        "DELETE FROM galleries_dbids WHERE gallery_name_part1 = ?1 AND gallery_name_part2 = ?2",
        rusqlite::params![split.part_1, split.part_2],
    )?;
    Ok(())
}

pub fn gallery_exists(driver: &StorageDriver, name: &str) -> Result<bool> {
    Ok(get_gallery_id_by_name(driver, name)?.is_some())
}
