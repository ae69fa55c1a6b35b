//! # Course Status Classifier
//!
//! Partitions a user's enrolled courses into four buckets:
//!
//! | Bucket | Source |
//! |--------|--------|
//! | enrolled | size of the enrollment lookup |
//! | completed | criteria-completion ledger row count |
//! | criteria undefined | enrolled courses with no completion criterion |
//! | in progress | `enrolled - (completed + criteria_undefined)` |
//!
//! The in-progress count is derived, never queried. Because the ledger count is
//! not restricted to the enrolled set, and counts one row per satisfied
//! criterion, the derived value can go negative. It is reported as-is;
//! [`ClassificationResult::is_consistent`] lets callers flag it.

use crate::{CourseDataGateway, CourseId, TrackerError, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// RESULT
// =============================================================================

/// The four-way partition of one user's enrolled courses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub user: UserId,
    pub enrolled: u64,
    pub completed: u64,
    pub in_progress: i64,
    pub criteria_undefined: u64,
    /// Enrolled courses without completion criteria, in enrollment order.
    pub criteria_undefined_courses: Vec<CourseId>,
}

impl ClassificationResult {
    /// Result for a user with nothing recorded anywhere.
    #[must_use]
    pub fn empty(user: UserId) -> Self {
        Self {
            user,
            enrolled: 0,
            completed: 0,
            in_progress: 0,
            criteria_undefined: 0,
            criteria_undefined_courses: Vec::new(),
        }
    }

    /// `false` when the ledger reports more completions than the enrolled set
    /// can account for, i.e. the in-progress count went negative.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.in_progress >= 0
    }

    /// How many ledger rows exceed what the enrolled set leaves room for.
    #[must_use]
    pub fn completion_overflow(&self) -> u64 {
        if self.in_progress < 0 {
            self.in_progress.unsigned_abs()
        } else {
            0
        }
    }
}

// =============================================================================
// CLASSIFIER
// =============================================================================

/// Computes [`ClassificationResult`]s from a [`CourseDataGateway`].
///
/// Stateless apart from the borrowed gateway; every call re-reads the source.
#[derive(Debug, Clone, Copy)]
pub struct CourseStatusClassifier<G> {
    gateway: G,
}

impl<G: CourseDataGateway> CourseStatusClassifier<G> {
    #[must_use]
    pub const fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Classify the user's enrolled courses.
    pub fn classify(&self, user: UserId) -> Result<ClassificationResult, TrackerError> {
        let enrolled_courses = self.gateway.enrolled_courses(user)?;
        let enrolled = enrolled_courses.len() as u64;

        let completed = self.gateway.completion_count(user)?;

        let mut criteria_undefined_courses = Vec::new();
        for course in &enrolled_courses {
            if !self.gateway.has_completion_criteria(course.id)? {
                criteria_undefined_courses.push(course.id);
            }
        }
        let criteria_undefined = criteria_undefined_courses.len() as u64;

        let in_progress = signed(enrolled)
            .saturating_sub(signed(completed).saturating_add(signed(criteria_undefined)));

        let result = ClassificationResult {
            user,
            enrolled,
            completed,
            in_progress,
            criteria_undefined,
            criteria_undefined_courses,
        };

        if result.is_consistent() {
            tracing::debug!(
                user = user.0,
                enrolled,
                completed,
                in_progress,
                criteria_undefined,
                "classified courses"
            );
        } else {
            tracing::warn!(
                user = user.0,
                enrolled,
                completed,
                in_progress,
                criteria_undefined,
                "completion ledger exceeds enrolled courses; in-progress count is negative"
            );
        }

        Ok(result)
    }

    /// Borrow the underlying gateway.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }
}

/// Counts past `i64::MAX` pin to it instead of wrapping negative.
fn signed(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryId, Catalog, Course, CriterionId, InProgressRow, Timestamp};

    fn course(id: u64) -> Course {
        Course::new(CourseId(id), CategoryId(1), format!("Course {id}"))
    }

    fn base_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_category(CategoryId(1), "Science");
        for id in 1..=3 {
            catalog.add_course(course(id));
        }
        catalog
    }

    #[test]
    fn zero_enrollments_yield_zero_counts() {
        let catalog = base_catalog();
        let classifier = CourseStatusClassifier::new(&catalog);

        let result = classifier.classify(UserId(42)).expect("classify");
        assert_eq!(result, ClassificationResult::empty(UserId(42)));
        assert!(result.is_consistent());
    }

    #[test]
    fn criteria_undefined_counts_only_courses_without_criteria() {
        let mut catalog = base_catalog();
        catalog.enroll(UserId(1), CourseId(1), Timestamp(100));
        catalog.enroll(UserId(1), CourseId(2), Timestamp(100));
        catalog.add_criterion(CriterionId(10), CourseId(1));

        let result = CourseStatusClassifier::new(&catalog)
            .classify(UserId(1))
            .expect("classify");

        assert_eq!(result.criteria_undefined, 1);
        assert_eq!(result.criteria_undefined_courses, vec![CourseId(2)]);
    }

    #[test]
    fn three_course_scenario() {
        let mut catalog = base_catalog();
        let user = UserId(5);
        for id in 1..=3 {
            catalog.enroll(user, CourseId(id), Timestamp(1_000));
        }
        // Course 1: criteria defined and completed.
        catalog.add_criterion(CriterionId(1), CourseId(1));
        catalog.record_criterion_completion(user, CourseId(1), CriterionId(1), Timestamp(2_000));
        // Course 2: no criteria at all.
        // Course 3: criteria defined, nothing completed.
        catalog.add_criterion(CriterionId(3), CourseId(3));

        let result = CourseStatusClassifier::new(&catalog)
            .classify(user)
            .expect("classify");

        assert_eq!(result.enrolled, 3);
        assert_eq!(result.completed, 1);
        assert_eq!(result.criteria_undefined, 1);
        assert_eq!(result.in_progress, 1);
    }

    #[test]
    fn multi_criterion_ledger_rows_drive_in_progress_negative() {
        let mut catalog = base_catalog();
        let user = UserId(9);
        catalog.enroll(user, CourseId(1), Timestamp(1_000));
        catalog.enroll(user, CourseId(2), Timestamp(1_000));
        catalog.add_criterion(CriterionId(1), CourseId(1));
        catalog.add_criterion(CriterionId(2), CourseId(1));
        catalog.add_criterion(CriterionId(3), CourseId(2));
        // Course 1 has two criteria, so it contributes two ledger rows.
        catalog.record_criterion_completion(user, CourseId(1), CriterionId(1), Timestamp(2_000));
        catalog.record_criterion_completion(user, CourseId(1), CriterionId(2), Timestamp(2_000));
        catalog.record_criterion_completion(user, CourseId(2), CriterionId(3), Timestamp(2_000));

        let result = CourseStatusClassifier::new(&catalog)
            .classify(user)
            .expect("classify");

        assert_eq!(result.enrolled, 2);
        assert_eq!(result.completed, 3);
        assert_eq!(result.in_progress, -1);
        assert!(!result.is_consistent());
        assert_eq!(result.completion_overflow(), 1);
    }

    #[test]
    fn ledger_rows_from_unenrolled_courses_are_still_counted() {
        let mut catalog = base_catalog();
        let user = UserId(3);
        catalog.enroll(user, CourseId(1), Timestamp(1_000));
        catalog.add_criterion(CriterionId(1), CourseId(1));
        catalog.add_criterion(CriterionId(2), CourseId(2));
        // Historical completion of a course the user has since left.
        catalog.record_criterion_completion(user, CourseId(2), CriterionId(2), Timestamp(500));

        let result = CourseStatusClassifier::new(&catalog)
            .classify(user)
            .expect("classify");

        assert_eq!(result.enrolled, 1);
        assert_eq!(result.completed, 1);
        assert_eq!(result.in_progress, 0);
    }

    #[test]
    fn partition_sums_to_enrolled() {
        let mut catalog = base_catalog();
        let user = UserId(1);
        for id in 1..=3 {
            catalog.enroll(user, CourseId(id), Timestamp(1_000));
        }
        catalog.add_criterion(CriterionId(1), CourseId(1));

        let result = CourseStatusClassifier::new(&catalog)
            .classify(user)
            .expect("classify");

        let total =
            result.completed as i64 + result.in_progress + result.criteria_undefined as i64;
        assert_eq!(total, result.enrolled as i64);
    }

    /// Wraps a catalog and reports a fixed ledger count.
    struct FixedLedger {
        catalog: Catalog,
        completions: u64,
    }

    impl CourseDataGateway for FixedLedger {
        fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, TrackerError> {
            self.catalog.enrolled_courses(user)
        }

        fn completion_count(&self, _user: UserId) -> Result<u64, TrackerError> {
            Ok(self.completions)
        }

        fn has_completion_criteria(&self, course: CourseId) -> Result<bool, TrackerError> {
            self.catalog.has_completion_criteria(course)
        }

        fn in_progress_rows(&self, user: UserId) -> Result<Vec<InProgressRow>, TrackerError> {
            self.catalog.in_progress_rows(user)
        }

        fn category_name(&self, category: CategoryId) -> Result<String, TrackerError> {
            self.catalog.category_name(category)
        }

        fn course_display_name(&self, course: CourseId) -> Result<String, TrackerError> {
            self.catalog.course_display_name(course)
        }
    }

    #[test]
    fn huge_ledger_count_saturates_instead_of_wrapping() {
        let mut catalog = base_catalog();
        catalog.enroll(UserId(1), CourseId(1), Timestamp(1_000));
        catalog.add_criterion(CriterionId(1), CourseId(1));

        for completions in [u64::MAX, i64::MAX as u64 + 1] {
            let gateway = FixedLedger {
                catalog: catalog.clone(),
                completions,
            };
            let result = CourseStatusClassifier::new(gateway)
                .classify(UserId(1))
                .expect("classify");

            assert_eq!(result.completed, completions);
            assert_eq!(result.in_progress, 1 - i64::MAX);
            assert!(!result.is_consistent());
        }
    }

    #[test]
    fn boxed_gateway_classifies() {
        let mut catalog = base_catalog();
        catalog.enroll(UserId(1), CourseId(2), Timestamp(1_000));
        let boxed: Box<dyn CourseDataGateway> = Box::new(catalog);

        let result = CourseStatusClassifier::new(boxed)
            .classify(UserId(1))
            .expect("classify");
        assert_eq!(result.enrolled, 1);
        assert_eq!(result.criteria_undefined, 1);
    }
}
