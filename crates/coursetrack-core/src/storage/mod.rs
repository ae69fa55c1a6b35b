//! # Storage
//!
//! Persistent catalog backends.

pub mod redb_catalog;

pub use redb_catalog::RedbCatalog;
