//! # Formats
//!
//! Serialization formats for catalog data. File I/O lives in the app layer.

pub mod snapshot;

pub use snapshot::{CatalogSnapshot, SnapshotHeader, snapshot_from_bytes, snapshot_to_bytes};
