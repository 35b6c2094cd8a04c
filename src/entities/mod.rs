//! C4: per-entity insert/get/update operations against the schema in
//! `crate::storage::schema`. One module per entity family, all sharing the
//! `&StorageDriver` handle — the façade described in the design's redesign
//! notes in place of the original's mixin-inheritance `H2HDB` god object.

pub mod comments;
pub mod files;
pub mod gallery;
pub mod gids;
pub mod queues;
pub mod tags;
pub mod times;
pub mod titles;
pub mod upload_accounts;

/// Declared byte limit for tag names, tag values, and upload accounts (I-191
/// in the design ledger).
pub const SHORT_FIELD_LIMIT: usize = 191;

use crate::errors::{H2hDbError, Result};

/// Shared guard used by every entity that stores a ≤191-byte field.
pub fn check_short_field(value: &str) -> Result<()> {
    if value.len() > SHORT_FIELD_LIMIT {
        return Err(H2hDbError::too_long(SHORT_FIELD_LIMIT, value));
    }
    Ok(())
}
