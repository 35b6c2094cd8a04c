//! The `galleries_comments` table (I4): a row exists only when the comment
//! is non-empty. `get_comment` answers "" rather than `NotFound` when absent
//! — it is a has-comment? probe, not a strict lookup.

use crate::errors::Result;
use crate::storage::StorageDriver;
use rusqlite::OptionalExtension;

pub fn insert_comment(driver: &StorageDriver, db_gallery_id: i64, comment: &str) -> Result<()> {
    if comment.is_empty() {
        return Ok(());
    }
    driver.execute_signalling_duplicates(
        "INSERT INTO galleries_comments (db_gallery_id, comment) VALUES (?1, ?2)",
        rusqlite::params![db_gallery_id, comment],
    )?;
    Ok(())
}

pub fn get_comment(driver: &StorageDriver, db_gallery_id: i64) -> Result<String> {
    let conn = driver.reader();
    let comment: Option<String> = conn
        .query_row(
            "SELECT comment FROM galleries_comments WHERE db_gallery_id = ?1",
            [db_gallery_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(comment.unwrap_or_default())
}
