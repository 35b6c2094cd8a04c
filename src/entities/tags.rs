//! Tag dictionary tables and gallery associations (§4.3's three-step
//! insert protocol: names, then values, then pairs, then associations).
//!
//! The source tolerates concurrent duplicate-key races by retrying with
//! the still-missing subset until it is empty. SQLite's `INSERT OR IGNORE`
//! collapses that fixed-point loop into a single idempotent statement —
//! the same idempotence the design asks of `ON DUPLICATE KEY UPDATE` in
//! the hash store (§4.4) — so each step here is insert-or-ignore followed
//! by a re-select, with no retry loop needed.

use crate::entities::check_short_field;
use crate::errors::Result;
use crate::storage::StorageDriver;
use std::collections::HashMap;

fn get_or_insert_ids(
    driver: &StorageDriver,
    table: &str,
    id_column: &str,
    value_column: &str,
    values: &[String],
) -> Result<HashMap<String, i64>> {
    for value in values {
        check_short_field(value)?;
    }
    let conn = driver.writer();
    for value in values {
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {table} ({value_column}) VALUES (?1)"
            ),
            [value],
        )?;
    }
    let mut resolved = HashMap::with_capacity(values.len());
    for value in values {
        if resolved.contains_key(value) {
            continue;
        }
        let id: i64 = conn.query_row(
            &format!("SELECT {id_column} FROM {table} WHERE {value_column} = ?1"),
            [value],
            |row| row.get(0),
        )?;
        resolved.insert(value.clone(), id);
    }
    Ok(resolved)
}

/// Insert (or resolve) every `(name, value)` pair and associate them with
/// `db_gallery_id`. Idempotent: re-running with the same pairs does nothing
/// beyond the no-op `INSERT OR IGNORE`s.
pub fn insert_tag_associations(
    driver: &StorageDriver,
    db_gallery_id: i64,
    pairs: &[(String, String)],
) -> Result<()> {
    if pairs.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = pairs.iter().map(|(n, _)| n.clone()).collect();
    let values: Vec<String> = pairs.iter().map(|(_, v)| v.clone()).collect();
    let name_ids = get_or_insert_ids(driver, "tag_names", "db_tag_name_id", "name", &names)?;
    let value_ids = get_or_insert_ids(driver, "tag_values", "db_tag_value_id", "value", &values)?;

    let conn = driver.writer();
    for (name, value) in pairs {
        let name_id = name_ids[name];
        let value_id = value_ids[value];
        conn.execute(
            "INSERT OR IGNORE INTO tag_pairs (db_tag_name_id, db_tag_value_id) VALUES (?1, ?2)",
            rusqlite::params![name_id, value_id],
        )?;
        let pair_id: i64 = conn.query_row(
            "SELECT db_tag_pair_id FROM tag_pairs WHERE db_tag_name_id = ?1 AND db_tag_value_id = ?2",
            rusqlite::params![name_id, value_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO gallery_tags (db_gallery_id, db_tag_pair_id) VALUES (?1, ?2)",
            rusqlite::params![db_gallery_id, pair_id],
        )?;
    }
    Ok(())
}

pub fn get_tag_pairs_for_gallery(
    driver: &StorageDriver,
    db_gallery_id: i64,
) -> Result<Vec<(String, String)>> {
    let conn = driver.reader();
    let mut stmt = conn.prepare(
        "SELECT tn.name, tv.value
         FROM gallery_tags gt
         JOIN tag_pairs tp ON tp.db_tag_pair_id = gt.db_tag_pair_id
         JOIN tag_names tn ON tn.db_tag_name_id = tp.db_tag_name_id
         JOIN tag_values tv ON tv.db_tag_value_id = tp.db_tag_value_id
         WHERE gt.db_gallery_id = ?1",
    )?;
    let pairs = stmt
        .query_map([db_gallery_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(pairs)
}
