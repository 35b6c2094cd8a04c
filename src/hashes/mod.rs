//! C5: the 11-algorithm content-addressed hash store. A dictionary table
//! per algorithm maps a unique digest to a surrogate id; a mapping table
//! per algorithm maps a file to that id.
//!
//! Digest computation runs in a `rayon` scope, one thread per file (the
//! teacher's `catalog/load.rs` pattern of `par_iter` over filesystem work),
//! reading each file's bytes once and feeding all 11 hashers from the same
//! buffer.

use crate::errors::Result;
use crate::storage::StorageDriver;
use blake2::{Blake2b512, Blake2s256};
use rayon::prelude::*;
use rusqlite::OptionalExtension;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use std::collections::HashMap;
use std::path::Path;

/// All 11 digest algorithms the store tracks. Only [`HashAlgorithm::Sha512`]
/// participates in duplicate detection (§4.6); the rest exist purely for
/// lookup, preserved per the design's open-question decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Blake2b,
    Blake2s,
}

pub const ALL_ALGORITHMS: &[HashAlgorithm] = &[
    HashAlgorithm::Sha1,
    HashAlgorithm::Sha224,
    HashAlgorithm::Sha256,
    HashAlgorithm::Sha384,
    HashAlgorithm::Sha512,
    HashAlgorithm::Sha3_224,
    HashAlgorithm::Sha3_256,
    HashAlgorithm::Sha3_384,
    HashAlgorithm::Sha3_512,
    HashAlgorithm::Blake2b,
    HashAlgorithm::Blake2s,
];

impl HashAlgorithm {
    fn dict_table(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "files_hashs_sha1_dbids",
            HashAlgorithm::Sha224 => "files_hashs_sha224_dbids",
            HashAlgorithm::Sha256 => "files_hashs_sha256_dbids",
            HashAlgorithm::Sha384 => "files_hashs_sha384_dbids",
            HashAlgorithm::Sha512 => "files_hashs_sha512_dbids",
            HashAlgorithm::Sha3_224 => "files_hashs_sha3_224_dbids",
            HashAlgorithm::Sha3_256 => "files_hashs_sha3_256_dbids",
            HashAlgorithm::Sha3_384 => "files_hashs_sha3_384_dbids",
            HashAlgorithm::Sha3_512 => "files_hashs_sha3_512_dbids",
            HashAlgorithm::Blake2b => "files_hashs_blake2b_dbids",
            HashAlgorithm::Blake2s => "files_hashs_blake2s_dbids",
        }
    }

    fn map_table(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "files_hashs_sha1",
            HashAlgorithm::Sha224 => "files_hashs_sha224",
            HashAlgorithm::Sha256 => "files_hashs_sha256",
            HashAlgorithm::Sha384 => "files_hashs_sha384",
            HashAlgorithm::Sha512 => "files_hashs_sha512",
            HashAlgorithm::Sha3_224 => "files_hashs_sha3_224",
            HashAlgorithm::Sha3_256 => "files_hashs_sha3_256",
            HashAlgorithm::Sha3_384 => "files_hashs_sha3_384",
            HashAlgorithm::Sha3_512 => "files_hashs_sha3_512",
            HashAlgorithm::Blake2b => "files_hashs_blake2b",
            HashAlgorithm::Blake2s => "files_hashs_blake2s",
        }
    }
}

/// Digest `bytes` under all 11 algorithms in one pass.
pub fn digest_all(bytes: &[u8]) -> HashMap<HashAlgorithm, Vec<u8>> {
    let mut digests = HashMap::with_capacity(ALL_ALGORITHMS.len());
    digests.insert(HashAlgorithm::Sha1, Sha1::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha224, Sha224::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha256, Sha256::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha384, Sha384::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha512, Sha512::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha3_224, Sha3_224::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha3_256, Sha3_256::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha3_384, Sha3_384::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Sha3_512, Sha3_512::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Blake2b, Blake2b512::digest(bytes).to_vec());
    digests.insert(HashAlgorithm::Blake2s, Blake2s256::digest(bytes).to_vec());
    digests
}

/// Digest every file in `paths`, reading each once, in parallel. Returns a
/// digest map per input path, indexed by position — callers zip this back
/// against their own `(path, db_file_id)` pairs.
pub fn digest_files_in_parallel(paths: &[impl AsRef<Path> + Sync]) -> Result<Vec<HashMap<HashAlgorithm, Vec<u8>>>> {
    paths
        .par_iter()
        .map(|path| {
            let bytes = std::fs::read(path.as_ref())?;
            Ok(digest_all(&bytes))
        })
        .collect()
}

/// Resolve (inserting if novel) the dictionary id for a single digest under
/// one algorithm. `INSERT OR IGNORE` makes the dictionary insert idempotent
/// under concurrent ingesters, matching the source's `ON DUPLICATE KEY
/// UPDATE db_hash_id = db_hash_id` idiom.
fn get_or_insert_dict_id(driver: &StorageDriver, algorithm: HashAlgorithm, digest: &[u8]) -> Result<i64> {
    let conn = driver.writer();
    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (hash_value) VALUES (?1)",
            algorithm.dict_table()
        ),
        [digest],
    )?;
    let id: i64 = conn.query_row(
        &format!(
            "SELECT db_hash_id FROM {} WHERE hash_value = ?1",
            algorithm.dict_table()
        ),
        [digest],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Register every algorithm's digest for one file (§4.4 step 2-3, collapsed
/// to per-file granularity since the per-gallery file counts here are small
/// enough that batching across files buys little).
pub fn register_file_hashes(
    driver: &StorageDriver,
    db_file_id: i64,
    digests: &HashMap<HashAlgorithm, Vec<u8>>,
) -> Result<()> {
    for algorithm in ALL_ALGORITHMS {
        let digest = &digests[algorithm];
        let hash_id = get_or_insert_dict_id(driver, *algorithm, digest)?;
        driver.writer().execute(
            &format!(
                "INSERT INTO {} (db_file_id, db_hash_id) VALUES (?1, ?2)",
                algorithm.map_table()
            ),
            rusqlite::params![db_file_id, hash_id],
        )?;
    }
    Ok(())
}

/// The stored sha512 digest of a gallery's file, if any row exists. Used by
/// the ingestor to decide whether `galleryinfo.txt` actually changed.
pub fn get_stored_sha512(driver: &StorageDriver, db_file_id: i64) -> Result<Option<Vec<u8>>> {
    let conn = driver.reader();
    let digest: Option<Vec<u8>> = conn
        .query_row(
            "SELECT d.hash_value FROM files_hashs_sha512 m
             JOIN files_hashs_sha512_dbids d ON d.db_hash_id = m.db_hash_id
             WHERE m.db_file_id = ?1",
            [db_file_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(digest)
}

/// Anti-join deletion of dictionary rows with no remaining mapping-table
/// reference, run per algorithm (§4.7 `refresh_current_files_hashs`).
pub fn reclaim_orphan_hashes(driver: &StorageDriver, algorithm: HashAlgorithm) -> Result<usize> {
    let affected = driver.writer().execute(
        &format!(
            "DELETE FROM {dict} WHERE db_hash_id NOT IN (SELECT db_hash_id FROM {map})",
            dict = algorithm.dict_table(),
            map = algorithm.map_table()
        ),
        [],
    )?;
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{files::insert_file, gallery::get_or_insert_gallery_id};
    use crate::storage::open_and_prepare;

    #[test]
    fn digest_all_produces_every_algorithm() {
        let digests = digest_all(b"hello");
        assert_eq!(digests.len(), ALL_ALGORITHMS.len());
        assert_eq!(digests[&HashAlgorithm::Sha1].len(), 20);
        assert_eq!(digests[&HashAlgorithm::Sha512].len(), 64);
        assert_eq!(digests[&HashAlgorithm::Blake2s].len(), 32);
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let gallery_id = get_or_insert_gallery_id(&driver, "G").unwrap();
        let file_id = insert_file(&driver, gallery_id, "1.jpg").unwrap();
        let digests = digest_all(b"A");
        register_file_hashes(&driver, file_id, &digests).unwrap();
        assert_eq!(
            get_stored_sha512(&driver, file_id).unwrap().unwrap(),
            digests[&HashAlgorithm::Sha512]
        );
    }

    #[test]
    fn shared_digest_reuses_the_same_dictionary_row() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let gallery_id = get_or_insert_gallery_id(&driver, "G").unwrap();
        let file_a = insert_file(&driver, gallery_id, "a.jpg").unwrap();
        let file_b = insert_file(&driver, gallery_id, "b.jpg").unwrap();
        let digests = digest_all(b"same bytes");
        register_file_hashes(&driver, file_a, &digests).unwrap();
        register_file_hashes(&driver, file_b, &digests).unwrap();

        let conn = driver.reader();
        let dict_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM files_hashs_sha512_dbids", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(dict_rows, 1);
    }

    #[test]
    fn reclaim_orphan_hashes_deletes_unreferenced_dictionary_rows() {
        let driver = StorageDriver::open_in_memory().unwrap();
        open_and_prepare(&driver).unwrap();
        let gallery_id = get_or_insert_gallery_id(&driver, "G").unwrap();
        let file_id = insert_file(&driver, gallery_id, "a.jpg").unwrap();
        let digests = digest_all(b"orphan me");
        register_file_hashes(&driver, file_id, &digests).unwrap();

        driver
            .writer()
            .execute("DELETE FROM files_hashs_sha512 WHERE db_file_id = ?1", [file_id])
            .unwrap();
        let reclaimed = reclaim_orphan_hashes(&driver, HashAlgorithm::Sha512).unwrap();
        assert_eq!(reclaimed, 1);
    }
}
