//! The `titles` table (I3): one free-text title per gallery.

use crate::errors::Result;
use crate::storage::StorageDriver;

pub fn insert_title(driver: &StorageDriver, db_gallery_id: i64, title: &str) -> Result<()> {
    driver.execute_signalling_duplicates(
        "INSERT INTO titles (db_gallery_id, title) VALUES (?1, ?2)",
        rusqlite::params![db_gallery_id, title],
    )?;
    Ok(())
}

pub fn get_title(driver: &StorageDriver, db_gallery_id: i64) -> Result<String> {
    driver.query_row_or_not_found(
        "SELECT title FROM titles WHERE db_gallery_id = ?1",
        [db_gallery_id],
        |row| row.get(0),
    )
}

pub fn update_title(driver: &StorageDriver, db_gallery_id: i64, title: &str) -> Result<()> {
    driver.writer().execute(
        "UPDATE titles SET title = ?2 WHERE db_gallery_id = ?1",
        rusqlite::params![db_gallery_id, title],
    )?;
    Ok(())
}
