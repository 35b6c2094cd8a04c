//! Fixed-width decomposition of gallery/file names into indexable column
//! parts, driven by the backend's index-prefix limit.
//!
//! SQLite has no InnoDB-style prefix-index byte cap, so the split exists
//! here purely to preserve the source system's indexing shape (and the
//! I-NAME-SPLIT invariant from the design). `L = 191` is kept from the
//! original MySQL-backed implementation.

use crate::errors::{H2hDbError, Result};

/// Index-prefix byte limit of the original backend.
pub const PREFIX_LIMIT: usize = 191;

/// Maximum declared length (bytes) of a gallery or file name.
pub const NAME_LENGTH_LIMIT: usize = 255;

/// The two column parts a name is split into. Concatenating them reproduces
/// the original name exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitName {
    pub part_1: String,
    pub part_2: String,
}

/// Split `name` into two fixed parts for composite indexing.
///
/// Returns `TooLong` if `name` exceeds [`NAME_LENGTH_LIMIT`] bytes.
pub fn split_name(name: &str) -> Result<SplitName> {
    if name.len() > NAME_LENGTH_LIMIT {
        return Err(H2hDbError::too_long(NAME_LENGTH_LIMIT, name));
    }

    if name.len() <= PREFIX_LIMIT {
        return Ok(SplitName {
            part_1: name.to_string(),
            part_2: String::new(),
        });
    }

    // Back off to the nearest char boundary at or before PREFIX_LIMIT so we
    // never split a multi-byte codepoint.
    let mut split_at = PREFIX_LIMIT;
    while !name.is_char_boundary(split_at) {
        split_at -= 1;
    }

    Ok(SplitName {
        part_1: name[..split_at].to_string(),
        part_2: name[split_at..].to_string(),
    })
}

/// Reassemble the original name from its split parts.
pub fn join_parts(part_1: &str, part_2: &str) -> String {
    format!("{part_1}{part_2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_lands_entirely_in_part_1() {
        let split = split_name("MyGallery [12345]").unwrap();
        assert_eq!(split.part_1, "MyGallery [12345]");
        assert_eq!(split.part_2, "");
    }

    #[test]
    fn round_trip_is_exact() {
        let name = "a".repeat(255);
        let split = split_name(&name).unwrap();
        assert_eq!(join_parts(&split.part_1, &split.part_2), name);
        assert!(split.part_1.len() <= PREFIX_LIMIT);
    }

    #[test]
    fn exactly_255_bytes_succeeds() {
        let name = "x".repeat(255);
        assert!(split_name(&name).is_ok());
    }

    #[test]
    fn exactly_256_bytes_is_too_long() {
        let name = "x".repeat(256);
        assert!(matches!(
            split_name(&name),
            Err(H2hDbError::TooLong { limit: 255, .. })
        ));
    }

    #[test]
    fn never_splits_a_multibyte_codepoint() {
        // 190 ascii bytes + a 3-byte char straddling the 191 boundary.
        let mut name = "a".repeat(190);
        name.push('€'); // 3 bytes in UTF-8
        name.push_str(&"b".repeat(60));
        let split = split_name(&name).unwrap();
        assert!(split.part_1.is_char_boundary(split.part_1.len()));
        assert_eq!(join_parts(&split.part_1, &split.part_2), name);
    }
}
