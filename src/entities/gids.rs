//! The `gids` table (I3): the public H@H gallery id, 1:1 with a gallery.

use crate::errors::Result;
use crate::storage::StorageDriver;
use rusqlite::OptionalExtension;

pub fn insert_gid(driver: &StorageDriver, db_gallery_id: i64, gid: i64) -> Result<()> {
    driver.execute_signalling_duplicates(
        "INSERT INTO gids (db_gallery_id, gid) VALUES (?1, ?2)",
        rusqlite::params![db_gallery_id, gid],
    )?;
    Ok(())
}

pub fn get_gid(driver: &StorageDriver, db_gallery_id: i64) -> Result<i64> {
    driver.query_row_or_not_found(
        "SELECT gid FROM gids WHERE db_gallery_id = ?1",
        [db_gallery_id],
        |row| row.get(0),
    )
}

pub fn get_gallery_id_by_gid(driver: &StorageDriver, gid: i64) -> Result<Option<i64>> {
    let conn = driver.reader();
    conn.query_row("SELECT db_gallery_id FROM gids WHERE gid = ?1", [gid], |row| {
        row.get(0)
    })
    .optional()
    .map_err(Into::into)
}

/// Per the design's open-question resolution: the source's `fetch_one`
/// returns `None` for an absent row and `check_gid_by_gid` treated that as
/// a latent bug (`len(None)` would have raised). Here `None` maps to
/// `false`, not an error.
pub fn check_gid_by_gid(driver: &StorageDriver, gid: i64) -> Result<bool> {
    Ok(get_gallery_id_by_gid(driver, gid)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::gallery::get_or_insert_gallery_id;
    use crate::storage::open_and_prepare;

    #[test]
    fn check_gid_by_gid_is_false_when_absent() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        assert!(!check_gid_by_gid(&driver, 99999).unwrap());
    }

    #[test]
    fn check_gid_by_gid_is_true_once_inserted() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let id = get_or_insert_gallery_id(&driver, "G").unwrap();
        insert_gid(&driver, id, 12345).unwrap();
        assert!(check_gid_by_gid(&driver, 12345).unwrap());
        assert_eq!(get_gid(&driver, id).unwrap(), 12345);
    }
}
