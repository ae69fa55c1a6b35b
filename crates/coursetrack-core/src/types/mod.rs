//! # Core Type Definitions
//!
//! This module contains the value types shared by every part of the tracker:
//! - Identifiers (`UserId`, `CourseId`, `CategoryId`, `CriterionId`)
//! - Host records (`Course`, `InProgressRow`, `CompletionRecord`, ...)
//! - Error types (`TrackerError`)
//!
//! All identifiers are opaque `u64` newtypes and implement `Ord` so they can
//! key `BTreeMap`s and redb tables with a stable iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Identifier of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseId(pub u64);

/// Identifier of a course category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub u64);

/// Identifier of a completion criterion attached to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CriterionId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "course:{}", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "category:{}", self.0)
    }
}

// =============================================================================
// TIMESTAMP
// =============================================================================

/// Unix timestamp in seconds, as stored by the host platform.
///
/// The host writes `0` for "never"; [`Timestamp::is_set`] treats any
/// non-positive value as unset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a timestamp from Unix seconds.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Raw Unix seconds.
    #[must_use]
    pub const fn secs(self) -> i64 {
        self.0
    }

    /// Whether the host actually recorded a moment here.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 > 0
    }
}

// =============================================================================
// HOST RECORDS
// =============================================================================

/// A course as returned by the enrollment lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub category: CategoryId,
    pub display_name: String,
}

impl Course {
    #[must_use]
    pub fn new(id: CourseId, category: CategoryId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            category,
            display_name: display_name.into(),
        }
    }
}

/// A course category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// An enrollment of a user in a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub user: UserId,
    pub course: CourseId,
    pub time_enrolled: Timestamp,
}

/// A completion criterion defined for a course.
///
/// Only its existence matters to classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionCriterion {
    pub id: CriterionId,
    pub course: CourseId,
}

/// One row of the criteria-completion ledger.
///
/// The host writes one row per criterion a user satisfies, so a single course
/// can contribute several rows. `(user, course, criterion)` identifies a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionCompletion {
    pub user: UserId,
    pub course: CourseId,
    pub criterion: CriterionId,
    pub time_completed: Timestamp,
}

/// Per-user, per-course completion tracking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub user: UserId,
    pub course: CourseId,
    pub time_enrolled: Option<Timestamp>,
    pub time_completed: Option<Timestamp>,
}

impl CompletionRecord {
    /// Enrolled with a real timestamp and not yet completed.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.time_completed.is_none() && self.time_enrolled.is_some_and(Timestamp::is_set)
    }
}

/// A row of the in-progress lookup: the course joined with its
/// completion record's enrollment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InProgressRow {
    pub course_id: CourseId,
    pub category: CategoryId,
    pub display_name: String,
    pub time_enrolled: Timestamp,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the tracker.
///
/// None are recovered inside the core; they propagate to the host.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The backing store could not be reached or a transaction failed.
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    /// A fetched record is missing a field the lookup expected.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Snapshot data failed validation before import.
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A file could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TrackerError {
    /// Shorthand used by storage code for backend failures.
    pub(crate) fn unavailable(e: impl fmt::Display) -> Self {
        Self::DataSourceUnavailable(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
