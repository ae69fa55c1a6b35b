//! # coursetrack-core
//!
//! Course-status classification for a learner dashboard - THE LOGIC.
//!
//! Given a user, the tracker reports how many courses they are enrolled in,
//! how many they completed, how many are in progress and how many have no
//! completion criteria defined, plus drill-down report tables.
//!
//! ## Architecture
//!
//! - All host data is read through the [`CourseDataGateway`] trait
//! - [`CourseStatusClassifier`] computes the four counts
//! - [`report`] builds the enrolled and in-progress tables
//! - [`Dashboard`] is the request-scoped context: injected dependencies,
//!   feature gate and memoization
//! - [`Catalog`] (in-memory) and [`RedbCatalog`] (disk) implement the gateway;
//!   [`Store`] selects between them at runtime
//!
//! ## Constraints
//!
//! - No async, no network dependencies
//! - Classification never writes
//! - `BTreeMap`/`BTreeSet` only, so every lookup has a stable order

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod classifier;
pub mod dashboard;
pub mod formats;
pub mod gateway;
pub mod primitives;
pub mod report;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Category, CategoryId, CompletionCriterion, CompletionRecord, Course, CourseId,
    CriterionCompletion, CriterionId, Enrollment, InProgressRow, Timestamp, TrackerError, UserId,
};

// =============================================================================
// RE-EXPORTS: Classification
// =============================================================================

pub use catalog::{Catalog, CatalogStats};
pub use classifier::{ClassificationResult, CourseStatusClassifier};
pub use dashboard::{
    CurrentUser, Dashboard, DashboardSummary, DashboardView, FeatureFlags, Metric, ReportKind,
};
pub use gateway::CourseDataGateway;
pub use report::{
    CourseLink, EnrolledCourseRow, EnrolledCoursesReport, InProgressCourseRow,
    InProgressCoursesReport, enrolled_courses_report, in_progress_courses_report,
};
pub use storage::RedbCatalog;
pub use store::Store;

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{CatalogSnapshot, snapshot_from_bytes, snapshot_to_bytes};
