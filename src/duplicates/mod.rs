//! C7: the Duplicate Analyzer. No mutable state of its own — every query
//! runs straight against the views `schema.rs` creates. The candidate-then-
//! score phasing here (count first, fetch only when it grew) mirrors the
//! two-phase idiom the teacher uses for audio fingerprint matching.

use crate::errors::Result;
use crate::storage::StorageDriver;
use std::collections::HashSet;

/// `count(*) on duplicated_files_hashs_sha512` — cheap to poll between
/// chunks to decide whether the exclusion set needs refreshing.
pub fn duplicated_hash_count(driver: &StorageDriver) -> Result<i64> {
    let conn = driver.reader();
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM duplicated_files_hashs_sha512",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// The exclusion set `E`: sha512 digests classed as cross-gallery
/// boilerplate per §4.6's artist-ratio rule.
pub fn get_duplicated_hash_values(driver: &StorageDriver) -> Result<HashSet<Vec<u8>>> {
    let conn = driver.reader();
    let mut stmt =
        conn.prepare("SELECT hash_value FROM duplicated_hash_values_by_count_artist_ratio")?;
    let values = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;
    Ok(values)
}

/// Galleries whose own pages are ≥90% duplicated against the rest of the
/// corpus (`duplicate_hash_in_gallery`), exposed for diagnostics/scanning.
pub fn highly_duplicated_galleries(driver: &StorageDriver) -> Result<Vec<i64>> {
    let conn = driver.reader();
    let mut stmt = conn.prepare("SELECT db_gallery_id FROM duplicate_hash_in_gallery")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}
