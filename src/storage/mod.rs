//! C1 + C2: the storage layer. Wires the generic SQLite driver
//! (`driver`), the fixed-width name codec (`name_splitter`), and the
//! catalog's own table/view definitions (`schema`) together.

mod driver;
mod name_splitter;
mod schema;

pub use driver::StorageDriver;
pub use name_splitter::{join_parts, split_name, SplitName, NAME_LENGTH_LIMIT, PREFIX_LIMIT};
pub use schema::{ALL_TABLES, MAIN_SCHEMA, VIEWS_SQL};

use crate::errors::{H2hDbError, Result};
use rusqlite::Connection;

/// Create every table declared in [`schema::MAIN_SCHEMA`] plus all derived
/// views, against a fresh (or freshly-opened empty) database file.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    MAIN_SCHEMA
        .create(conn)
        .map_err(|err| H2hDbError::Config(format!("schema creation failed: {err}")))?;
    for (name, sql) in VIEWS_SQL {
        conn.execute(sql, []).map_err(|err| {
            H2hDbError::Config(format!("view '{name}' creation failed: {err}"))
        })?;
    }
    Ok(())
}

/// Compare the live database's shape against [`schema::MAIN_SCHEMA`],
/// surfacing drift as a `Config` error rather than a silent corruption.
pub fn validate_schema(conn: &Connection) -> Result<()> {
    MAIN_SCHEMA
        .validate(conn)
        .map_err(|err| H2hDbError::Config(format!("schema validation failed: {err}")))
}

/// Bring a [`StorageDriver`] up: create the schema if the core table is
/// absent, otherwise validate the existing one, then check server-wide
/// settings. Mirrors the teacher's store-open sequence.
pub fn open_and_prepare(driver: &StorageDriver) -> Result<()> {
    driver.check_database_settings()?;
    if !driver.table_exists("galleries_dbids")? {
        initialize_schema(&driver.writer())?;
    } else {
        validate_schema(&driver.writer())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_initializes_and_validates() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        assert!(driver.table_exists("galleries_dbids").unwrap());
        assert!(driver.table_exists("files_hashs_sha512_dbids").unwrap());
    }

    #[test]
    fn reopening_an_initialized_database_validates_cleanly() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        open_and_prepare(&driver).unwrap();
    }

    #[test]
    fn views_query_without_error_on_an_empty_database() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let conn = driver.reader();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM galleries_infos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM pending_download_gids", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
