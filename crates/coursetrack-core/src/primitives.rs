//! # Primitives
//!
//! Fixed constants for the snapshot format and input validation.

/// Magic bytes for the binary catalog snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"CTRK";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a course or category name, in bytes.
pub const MAX_NAME_LENGTH: usize = 1333;

/// Maximum number of records of any one kind in a snapshot.
pub const MAX_SNAPSHOT_RECORDS: usize = 1_000_000;
