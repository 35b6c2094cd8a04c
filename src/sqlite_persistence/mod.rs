//! Backend-agnostic-in-spirit, SQLite-in-practice schema DDL generation and
//! drift validation. Shared by every feature store in this crate.

mod versioned_schema;

pub use versioned_schema::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, BASE_DB_VERSION,
    DEFAULT_TIMESTAMP,
};
