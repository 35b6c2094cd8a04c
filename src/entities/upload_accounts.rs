//! The `upload_accounts` table (I3). The account name is a ≤191-byte field.

use crate::entities::check_short_field;
use crate::errors::Result;
use crate::storage::StorageDriver;

pub fn insert_upload_account(
    driver: &StorageDriver,
    db_gallery_id: i64,
    account: &str,
) -> Result<()> {
    check_short_field(account)?;
    driver.execute_signalling_duplicates(
        "INSERT INTO upload_accounts (db_gallery_id, upload_account) VALUES (?1, ?2)",
        rusqlite::params![db_gallery_id, account],
    )?;
    Ok(())
}

pub fn get_upload_account(driver: &StorageDriver, db_gallery_id: i64) -> Result<String> {
    driver.query_row_or_not_found(
        "SELECT upload_account FROM upload_accounts WHERE db_gallery_id = ?1",
        [db_gallery_id],
        |row| row.get(0),
    )
}

pub fn update_upload_account(
    driver: &StorageDriver,
    db_gallery_id: i64,
    account: &str,
) -> Result<()> {
    check_short_field(account)?;
    driver.writer().execute(
        "UPDATE upload_accounts SET upload_account = ?2 WHERE db_gallery_id = ?1",
        rusqlite::params![db_gallery_id, account],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::gallery::get_or_insert_gallery_id;
    use crate::errors::H2hDbError;
    use crate::storage::open_and_prepare;

    #[test]
    fn insert_then_get_round_trips() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let id = get_or_insert_gallery_id(&driver, "G").unwrap();
        insert_upload_account(&driver, id, "alice").unwrap();
        assert_eq!(get_upload_account(&driver, id).unwrap(), "alice");
    }

    #[test]
    fn account_over_191_bytes_is_rejected() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let id = get_or_insert_gallery_id(&driver, "G").unwrap();
        let account = "a".repeat(192);
        assert!(matches!(
            insert_upload_account(&driver, id, &account),
            Err(H2hDbError::TooLong { limit: 191, .. })
        ));
    }
}
