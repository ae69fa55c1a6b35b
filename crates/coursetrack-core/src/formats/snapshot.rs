//! # Catalog Snapshot
//!
//! The exchange format for host data: every table the tracker reads, as plain
//! record lists. The app reads snapshots as JSON for import and the file
//! backend stores them in a binary form.
//!
//! Binary format: Header (5 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("CTRK")
//! - 1 byte: Version
//!
//! Size and header checks run before the payload is decoded.

use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES, MAX_NAME_LENGTH, MAX_SNAPSHOT_RECORDS};
use crate::{
    Category, CompletionCriterion, CompletionRecord, Course, CourseId, CriterionCompletion,
    Enrollment, TrackerError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum accepted size of a binary snapshot (256 MB).
pub const MAX_SNAPSHOT_BYTES: usize = 256 * 1024 * 1024;

const HEADER_LEN: usize = 5;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// All host tables as record lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub criteria: Vec<CompletionCriterion>,
    #[serde(default)]
    pub criterion_completions: Vec<CriterionCompletion>,
    #[serde(default)]
    pub completions: Vec<CompletionRecord>,
}

impl CatalogSnapshot {
    /// Check the snapshot before it reaches a store.
    ///
    /// Rejected:
    /// - more than `MAX_SNAPSHOT_RECORDS` records in any table
    /// - empty or oversized course and category names
    /// - duplicate course, category or criterion ids
    /// - enrollments in courses the snapshot does not define
    ///
    /// Ledger rows and completion records may reference courses that are
    /// gone; the host keeps those too.
    pub fn validate(&self) -> Result<(), TrackerError> {
        let tables = [
            ("categories", self.categories.len()),
            ("courses", self.courses.len()),
            ("enrollments", self.enrollments.len()),
            ("criteria", self.criteria.len()),
            ("criterion_completions", self.criterion_completions.len()),
            ("completions", self.completions.len()),
        ];
        for (table, len) in tables {
            if len > MAX_SNAPSHOT_RECORDS {
                return Err(TrackerError::InvalidSnapshot(format!(
                    "{} has {} records, maximum is {}",
                    table, len, MAX_SNAPSHOT_RECORDS
                )));
            }
        }

        let mut category_ids = BTreeSet::new();
        for category in &self.categories {
            check_name(&category.name, "category")?;
            if !category_ids.insert(category.id) {
                return Err(TrackerError::InvalidSnapshot(format!(
                    "duplicate {}",
                    category.id
                )));
            }
        }

        let mut course_ids: BTreeSet<CourseId> = BTreeSet::new();
        for course in &self.courses {
            check_name(&course.display_name, "course")?;
            if !course_ids.insert(course.id) {
                return Err(TrackerError::InvalidSnapshot(format!(
                    "duplicate {}",
                    course.id
                )));
            }
        }

        let mut criterion_ids = BTreeSet::new();
        for criterion in &self.criteria {
            if !criterion_ids.insert(criterion.id) {
                return Err(TrackerError::InvalidSnapshot(format!(
                    "duplicate criterion {}",
                    criterion.id.0
                )));
            }
        }

        for enrollment in &self.enrollments {
            if !course_ids.contains(&enrollment.course) {
                return Err(TrackerError::InvalidSnapshot(format!(
                    "{} enrolled in unknown {}",
                    enrollment.user, enrollment.course
                )));
            }
        }

        Ok(())
    }

    /// Total number of records across all tables.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.categories.len()
            + self.courses.len()
            + self.enrollments.len()
            + self.criteria.len()
            + self.criterion_completions.len()
            + self.completions.len()
    }
}

fn check_name(name: &str, kind: &str) -> Result<(), TrackerError> {
    if name.trim().is_empty() {
        return Err(TrackerError::InvalidSnapshot(format!("{} name is empty", kind)));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(TrackerError::InvalidSnapshot(format!(
            "{} name length {} exceeds maximum {} bytes",
            kind,
            name.len(),
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// FILE HEADER
// =============================================================================

/// Header preceding binary snapshot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if &self.magic != MAGIC_BYTES {
            return Err(TrackerError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(TrackerError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrackerError> {
        if bytes.len() < HEADER_LEN {
            return Err(TrackerError::Serialization("Header too short".to_string()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a snapshot to bytes (header + payload).
pub fn snapshot_to_bytes(snapshot: &CatalogSnapshot) -> Result<Vec<u8>, TrackerError> {
    let payload =
        postcard::to_stdvec(snapshot).map_err(|e| TrackerError::Serialization(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot from bytes.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<CatalogSnapshot, TrackerError> {
    if bytes.len() > MAX_SNAPSHOT_BYTES {
        return Err(TrackerError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_BYTES
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        TrackerError::Serialization(format!("Failed to deserialize snapshot: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryId, Timestamp, UserId};

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            categories: vec![Category {
                id: CategoryId(1),
                name: "Arts".to_string(),
            }],
            courses: vec![Course::new(CourseId(1), CategoryId(1), "Painting")],
            enrollments: vec![Enrollment {
                user: UserId(1),
                course: CourseId(1),
                time_enrolled: Timestamp(100),
            }],
            ..CatalogSnapshot::default()
        }
    }

    #[test]
    fn valid_snapshot_passes() {
        assert!(snapshot().validate().is_ok());
        assert_eq!(snapshot().record_count(), 3);
    }

    #[test]
    fn duplicate_course_rejected() {
        let mut snap = snapshot();
        snap.courses
            .push(Course::new(CourseId(1), CategoryId(1), "Painting again"));
        assert!(matches!(
            snap.validate(),
            Err(TrackerError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn enrollment_in_unknown_course_rejected() {
        let mut snap = snapshot();
        snap.enrollments.push(Enrollment {
            user: UserId(2),
            course: CourseId(404),
            time_enrolled: Timestamp(1),
        });
        assert!(matches!(
            snap.validate(),
            Err(TrackerError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn empty_name_rejected() {
        let mut snap = snapshot();
        snap.categories[0].name = "   ".to_string();
        assert!(snap.validate().is_err());
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let bytes1 = snapshot_to_bytes(&snapshot()).expect("serialize");
        let restored = snapshot_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = snapshot_to_bytes(&restored).expect("reserialize");
        assert_eq!(bytes1, bytes2);
        assert_eq!(restored, snapshot());
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(snapshot_from_bytes(&bytes).is_err());
    }

    #[test]
    fn short_input_rejected() {
        assert!(snapshot_from_bytes(b"CTR").is_err());
    }
}
