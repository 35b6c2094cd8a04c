//! The `files_dbids` / `files_names` pair (I2): one row per file under a
//! gallery, including `galleryinfo.txt` itself.

use crate::errors::{H2hDbError, Result};
use crate::storage::{join_parts, split_name, StorageDriver};

/// Insert a file row and return its surrogate id.
pub fn insert_file(driver: &StorageDriver, db_gallery_id: i64, file_name: &str) -> Result<i64> {
    let split = split_name(file_name)?;
    let conn = driver.writer();
    conn.execute(
        "INSERT INTO files_dbids (db_gallery_id, file_name_part1, file_name_part2)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![db_gallery_id, split.part_1, split.part_2],
    )
    .map_err(|err| {
        if H2hDbError::is_duplicate_key(&err) {
            H2hDbError::DuplicateKey
        } else {
            H2hDbError::Sqlite(err)
        }
    })?;
    let db_file_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO files_names (db_file_id, full_name) VALUES (?1, ?2)",
        rusqlite::params![db_file_id, file_name],
    )?;
    Ok(db_file_id)
}

pub fn get_file_id(driver: &StorageDriver, db_gallery_id: i64, file_name: &str) -> Result<i64> {
    let split = split_name(file_name)?;
    driver.query_row_or_not_found(
        "SELECT db_file_id FROM files_dbids
         WHERE db_gallery_id = ?1 AND file_name_part1 = ?2 AND file_name_part2 = ?3",
        rusqlite::params![db_gallery_id, split.part_1, split.part_2],
        |row| row.get(0),
    )
}

/// All file names under a gallery, in no particular order.
pub fn get_files_for_gallery(driver: &StorageDriver, db_gallery_id: i64) -> Result<Vec<String>> {
    let conn = driver.reader();
    let mut stmt = conn.prepare(
        "SELECT file_name_part1, file_name_part2 FROM files_dbids WHERE db_gallery_id = ?1",
    )?;
    let names = stmt
        .query_map([db_gallery_id], |row| {
            let part_1: String = row.get(0)?;
            let part_2: String = row.get(1)?;
            Ok(join_parts(&part_1, &part_2))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::gallery::get_or_insert_gallery_id;
    use crate::storage::open_and_prepare;
    use std::collections::HashSet;

    #[test]
    fn insert_and_list_files() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let gallery_id = get_or_insert_gallery_id(&driver, "G").unwrap();
        insert_file(&driver, gallery_id, "galleryinfo.txt").unwrap();
        insert_file(&driver, gallery_id, "1.jpg").unwrap();
        insert_file(&driver, gallery_id, "2.jpg").unwrap();

        let names: HashSet<_> = get_files_for_gallery(&driver, gallery_id)
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            names,
            HashSet::from([
                "galleryinfo.txt".to_string(),
                "1.jpg".to_string(),
                "2.jpg".to_string()
            ])
        );
    }

    #[test]
    fn duplicate_file_insert_is_signalled() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let gallery_id = get_or_insert_gallery_id(&driver, "G").unwrap();
        insert_file(&driver, gallery_id, "1.jpg").unwrap();
        assert!(matches!(
            insert_file(&driver, gallery_id, "1.jpg"),
            Err(H2hDbError::DuplicateKey)
        ));
    }
}
