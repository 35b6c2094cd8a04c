//! The five per-gallery datetime attributes. All second-precision local
//! calendar datetimes, stored as `TEXT` in `"%Y-%m-%d %H:%M:%S"` form.

use crate::errors::{H2hDbError, Result};
use crate::storage::StorageDriver;
use chrono::NaiveDateTime;

/// Which of the five identically-shaped time tables an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    Upload,
    Download,
    Modified,
    Access,
    Redownload,
}

impl TimeKind {
    fn table_name(self) -> &'static str {
        match self {
            TimeKind::Upload => "upload_times",
            TimeKind::Download => "download_times",
            TimeKind::Modified => "modified_times",
            TimeKind::Access => "access_times",
            TimeKind::Redownload => "redownload_times",
        }
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn insert_time(
    driver: &StorageDriver,
    kind: TimeKind,
    db_gallery_id: i64,
    time: NaiveDateTime,
) -> Result<()> {
    driver.execute_signalling_duplicates(
        &format!(
            "INSERT INTO {} (db_gallery_id, time) VALUES (?1, ?2)",
            kind.table_name()
        ),
        rusqlite::params![db_gallery_id, time.format(TIME_FORMAT).to_string()],
    )?;
    Ok(())
}

pub fn get_time(driver: &StorageDriver, kind: TimeKind, db_gallery_id: i64) -> Result<NaiveDateTime> {
    let raw: String = driver.query_row_or_not_found(
        &format!("SELECT time FROM {} WHERE db_gallery_id = ?1", kind.table_name()),
        [db_gallery_id],
        |row| row.get(0),
    )?;
    NaiveDateTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|_| H2hDbError::Config(format!("unparseable stored datetime: {raw}")))
}

pub fn update_time(
    driver: &StorageDriver,
    kind: TimeKind,
    db_gallery_id: i64,
    time: NaiveDateTime,
) -> Result<()> {
    driver.writer().execute(
        &format!(
            "UPDATE {} SET time = ?2 WHERE db_gallery_id = ?1",
            kind.table_name()
        ),
        rusqlite::params![db_gallery_id, time.format(TIME_FORMAT).to_string()],
    )?;
    Ok(())
}

/// The redownload-time reset pass (§4.9 step 9): for every gallery whose
/// `redownload_time` differs from its `download_time`, set it equal.
pub fn reset_stale_redownload_times(driver: &StorageDriver) -> Result<usize> {
    let affected = driver.writer().execute(
        "UPDATE redownload_times
         SET time = (SELECT dt.time FROM download_times dt WHERE dt.db_gallery_id = redownload_times.db_gallery_id)
         WHERE time <> (SELECT dt.time FROM download_times dt WHERE dt.db_gallery_id = redownload_times.db_gallery_id)",
        [],
    )?;
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::gallery::get_or_insert_gallery_id;
    use crate::storage::open_and_prepare;

    fn fresh_driver() -> StorageDriver {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        driver
    }

    #[test]
    fn insert_then_get_round_trips_to_the_second() {
        let driver = fresh_driver();
        let id = get_or_insert_gallery_id(&driver, "G").unwrap();
        let time = NaiveDateTime::parse_from_str("2024-01-02 03:04:05", TIME_FORMAT).unwrap();
        insert_time(&driver, TimeKind::Upload, id, time).unwrap();
        assert_eq!(get_time(&driver, TimeKind::Upload, id).unwrap(), time);
    }

    #[test]
    fn update_overwrites() {
        let driver = fresh_driver();
        let id = get_or_insert_gallery_id(&driver, "G").unwrap();
        let t1 = NaiveDateTime::parse_from_str("2024-01-01 00:00:00", TIME_FORMAT).unwrap();
        let t2 = NaiveDateTime::parse_from_str("2024-02-01 00:00:00", TIME_FORMAT).unwrap();
        insert_time(&driver, TimeKind::Access, id, t1).unwrap();
        update_time(&driver, TimeKind::Access, id, t2).unwrap();
        assert_eq!(get_time(&driver, TimeKind::Access, id).unwrap(), t2);
    }

    #[test]
    fn reset_stale_redownload_times_pulls_download_time_forward() {
        let driver = fresh_driver();
        let id = get_or_insert_gallery_id(&driver, "G").unwrap();
        let old = NaiveDateTime::parse_from_str("2024-01-01 00:00:00", TIME_FORMAT).unwrap();
        let newer = NaiveDateTime::parse_from_str("2024-06-01 00:00:00", TIME_FORMAT).unwrap();
        insert_time(&driver, TimeKind::Redownload, id, old).unwrap();
        insert_time(&driver, TimeKind::Download, id, newer).unwrap();
        let affected = reset_stale_redownload_times(&driver).unwrap();
        assert_eq!(affected, 1);
        assert_eq!(get_time(&driver, TimeKind::Redownload, id).unwrap(), newer);
    }
}
