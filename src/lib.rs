//! H@H catalog engine: gallery ingestion, cross-gallery duplicate detection,
//! CBZ archival, and Komga library sync, backed by SQLite.
//!
//! This library exposes its internal modules for integration testing and
//! reuse by the `h2hdb-sql` and `h2hdb-cbz` binaries.

pub mod archive;
pub mod concurrency;
pub mod config;
pub mod duplicates;
pub mod entities;
pub mod errors;
pub mod gallery_info;
pub mod hashes;
pub mod ingestion;
pub mod komga;
pub mod logging;
pub mod orchestrator;
pub mod scanner;
pub mod sqlite_persistence;
pub mod storage;

pub use errors::{H2hDbError, Result};
pub use storage::StorageDriver;
