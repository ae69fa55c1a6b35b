//! # Course Data Gateway
//!
//! The narrow read-only interface through which the tracker reaches host data.
//!
//! Every lookup is fallible so in-memory and persistent backends can be used
//! uniformly. A user the host does not know simply has no rows: lookups keyed
//! by user return empty collections or zero, never an error.

use crate::{CategoryId, Course, CourseId, InProgressRow, TrackerError, UserId};

// =============================================================================
// GATEWAY TRAIT
// =============================================================================

/// Host data lookups consumed by the classifier and the report builders.
pub trait CourseDataGateway {
    /// Courses the user is enrolled in, in the backend's enrollment order.
    fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, TrackerError>;

    /// Number of criteria-completion ledger rows recorded for the user.
    ///
    /// Not restricted to the courses the user is currently enrolled in.
    fn completion_count(&self, user: UserId) -> Result<u64, TrackerError>;

    /// Whether at least one completion criterion is defined for the course.
    fn has_completion_criteria(&self, course: CourseId) -> Result<bool, TrackerError>;

    /// Courses whose completion record has an enrollment time and no
    /// completion time.
    fn in_progress_rows(&self, user: UserId) -> Result<Vec<InProgressRow>, TrackerError>;

    /// Display name of a category. Unknown ids are a `MalformedRecord`.
    fn category_name(&self, category: CategoryId) -> Result<String, TrackerError>;

    /// Display name of a course. Unknown ids are a `MalformedRecord`.
    fn course_display_name(&self, course: CourseId) -> Result<String, TrackerError>;
}

impl<G: CourseDataGateway + ?Sized> CourseDataGateway for &G {
    fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, TrackerError> {
        (**self).enrolled_courses(user)
    }

    fn completion_count(&self, user: UserId) -> Result<u64, TrackerError> {
        (**self).completion_count(user)
    }

    fn has_completion_criteria(&self, course: CourseId) -> Result<bool, TrackerError> {
        (**self).has_completion_criteria(course)
    }

    fn in_progress_rows(&self, user: UserId) -> Result<Vec<InProgressRow>, TrackerError> {
        (**self).in_progress_rows(user)
    }

    fn category_name(&self, category: CategoryId) -> Result<String, TrackerError> {
        (**self).category_name(category)
    }

    fn course_display_name(&self, course: CourseId) -> Result<String, TrackerError> {
        (**self).course_display_name(course)
    }
}

impl<G: CourseDataGateway + ?Sized> CourseDataGateway for Box<G> {
    fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, TrackerError> {
        (**self).enrolled_courses(user)
    }

    fn completion_count(&self, user: UserId) -> Result<u64, TrackerError> {
        (**self).completion_count(user)
    }

    fn has_completion_criteria(&self, course: CourseId) -> Result<bool, TrackerError> {
        (**self).has_completion_criteria(course)
    }

    fn in_progress_rows(&self, user: UserId) -> Result<Vec<InProgressRow>, TrackerError> {
        (**self).in_progress_rows(user)
    }

    fn category_name(&self, category: CategoryId) -> Result<String, TrackerError> {
        (**self).category_name(category)
    }

    fn course_display_name(&self, course: CourseId) -> Result<String, TrackerError> {
        (**self).course_display_name(course)
    }
}
