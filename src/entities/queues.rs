//! The four gid queues (§3 "Gid Queue") plus the tombstone table that backs
//! the ingestor's crash-recovery protocol (I6).

use crate::errors::Result;
use crate::storage::StorageDriver;
use rusqlite::OptionalExtension;

// ---------------------------------------------------------------------
// removed_galleries_gids
// ---------------------------------------------------------------------

pub fn mark_gallery_removed(driver: &StorageDriver, gid: i64) -> Result<()> {
    driver
        .writer()
        .execute("INSERT OR IGNORE INTO removed_galleries_gids (gid) VALUES (?1)", [gid])?;
    Ok(())
}

pub fn is_gallery_removed(driver: &StorageDriver, gid: i64) -> Result<bool> {
    let conn = driver.reader();
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM removed_galleries_gids WHERE gid = ?1",
            [gid],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

// ---------------------------------------------------------------------
// todelete_gids
// ---------------------------------------------------------------------

pub fn schedule_gid_for_deletion(driver: &StorageDriver, gid: i64) -> Result<()> {
    driver
        .writer()
        .execute("INSERT OR IGNORE INTO todelete_gids (gid) VALUES (?1)", [gid])?;
    Ok(())
}

pub fn get_todelete_gids(driver: &StorageDriver) -> Result<Vec<i64>> {
    let conn = driver.reader();
    let mut stmt = conn.prepare("SELECT gid FROM todelete_gids")?;
    let gids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(gids)
}

pub fn remove_todelete_gid(driver: &StorageDriver, gid: i64) -> Result<()> {
    driver
        .writer()
        .execute("DELETE FROM todelete_gids WHERE gid = ?1", [gid])?;
    Ok(())
}

// ---------------------------------------------------------------------
// todownload_gids (I7: at most one row per gid; an empty URL is upgraded
// by a later insert carrying a concrete one)
// ---------------------------------------------------------------------

pub fn insert_todownload_gid(driver: &StorageDriver, gid: i64, url: &str) -> Result<()> {
    let conn = driver.writer();
    conn.execute(
        "INSERT INTO todownload_gids (gid, url) VALUES (?1, ?2)
         ON CONFLICT(gid) DO UPDATE SET url = excluded.url
         WHERE todownload_gids.url = ''",
        rusqlite::params![gid, url],
    )?;
    Ok(())
}

pub fn get_todownload_gids(driver: &StorageDriver) -> Result<Vec<(i64, String)>> {
    let conn = driver.reader();
    let mut stmt = conn.prepare("SELECT gid, url FROM todownload_gids")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn remove_todownload_gid(driver: &StorageDriver, gid: i64) -> Result<()> {
    driver
        .writer()
        .execute("DELETE FROM todownload_gids WHERE gid = ?1", [gid])?;
    Ok(())
}

// ---------------------------------------------------------------------
// pending_gallery_removals (the ingestion tombstone, I6)
// ---------------------------------------------------------------------

pub fn add_tombstone(driver: &StorageDriver, gallery_name: &str) -> Result<()> {
    driver.writer().execute(
        "INSERT OR IGNORE INTO pending_gallery_removals (gallery_name) VALUES (?1)",
        [gallery_name],
    )?;
    Ok(())
}

pub fn remove_tombstone(driver: &StorageDriver, gallery_name: &str) -> Result<()> {
    driver.writer().execute(
        "DELETE FROM pending_gallery_removals WHERE gallery_name = ?1",
        [gallery_name],
    )?;
    Ok(())
}

pub fn list_tombstones(driver: &StorageDriver) -> Result<Vec<String>> {
    let conn = driver.reader();
    let mut stmt = conn.prepare("SELECT gallery_name FROM pending_gallery_removals")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}
