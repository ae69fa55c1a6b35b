//! # In-memory Catalog
//!
//! A `BTreeMap`-backed copy of the host tables the tracker reads. Iteration
//! order is by id, so enrollment lookups return courses in ascending course id.
//!
//! The mutators exist to load data (tests, snapshot import). The tracker
//! itself only goes through [`CourseDataGateway`].

use crate::formats::CatalogSnapshot;
use crate::{
    Category, CategoryId, CompletionCriterion, CompletionRecord, Course, CourseDataGateway,
    CourseId, CriterionCompletion, CriterionId, Enrollment, InProgressRow, Timestamp, TrackerError,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Row counts per table, for status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogStats {
    pub categories: usize,
    pub courses: usize,
    pub enrollments: usize,
    pub criteria: usize,
    pub ledger_rows: usize,
    pub completion_records: usize,
}

/// In-memory host data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    categories: BTreeMap<CategoryId, String>,
    courses: BTreeMap<CourseId, Course>,
    /// (user, course) -> time enrolled
    enrollments: BTreeMap<(UserId, CourseId), Timestamp>,
    /// criterion -> owning course
    criteria: BTreeMap<CriterionId, CourseId>,
    /// (course, criterion) pairs, for per-course range scans
    course_criteria: BTreeSet<(CourseId, CriterionId)>,
    /// Criteria-completion ledger: (user, course, criterion) -> time completed
    ledger: BTreeMap<(UserId, CourseId, CriterionId), Timestamp>,
    completions: BTreeMap<(UserId, CourseId), CompletionRecord>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_category(&mut self, id: CategoryId, name: impl Into<String>) {
        self.categories.insert(id, name.into());
    }

    pub fn add_course(&mut self, course: Course) {
        self.courses.insert(course.id, course);
    }

    pub fn enroll(&mut self, user: UserId, course: CourseId, time_enrolled: Timestamp) {
        self.enrollments.insert((user, course), time_enrolled);
    }

    /// Attach a criterion to a course. A criterion belongs to one course, so
    /// re-adding it under another course moves it.
    pub fn add_criterion(&mut self, id: CriterionId, course: CourseId) {
        if let Some(previous) = self.criteria.insert(id, course) {
            self.course_criteria.remove(&(previous, id));
        }
        self.course_criteria.insert((course, id));
    }

    /// Record that a user satisfied a criterion. The host keeps one row per
    /// (user, course, criterion); recording it again updates the time.
    pub fn record_criterion_completion(
        &mut self,
        user: UserId,
        course: CourseId,
        criterion: CriterionId,
        time_completed: Timestamp,
    ) {
        self.ledger.insert((user, course, criterion), time_completed);
    }

    /// Open a completion record with an enrollment time and no completion.
    pub fn start_tracking(&mut self, user: UserId, course: CourseId, time_enrolled: Timestamp) {
        self.set_completion_record(CompletionRecord {
            user,
            course,
            time_enrolled: Some(time_enrolled),
            time_completed: None,
        });
    }

    /// Insert or replace a completion record.
    pub fn set_completion_record(&mut self, record: CompletionRecord) {
        self.completions.insert((record.user, record.course), record);
    }

    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        CatalogStats {
            categories: self.categories.len(),
            courses: self.courses.len(),
            enrollments: self.enrollments.len(),
            criteria: self.criteria.len(),
            ledger_rows: self.ledger.len(),
            completion_records: self.completions.len(),
        }
    }

    /// Build a catalog from a validated snapshot.
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Result<Self, TrackerError> {
        let mut catalog = Self::new();
        catalog.import_snapshot(snapshot)?;
        Ok(catalog)
    }

    /// Validate a snapshot and merge it into this catalog.
    ///
    /// Every table is keyed, so records overwrite their earlier versions and
    /// importing the same snapshot twice changes nothing. On a validation
    /// error the catalog is left untouched.
    pub fn import_snapshot(&mut self, snapshot: CatalogSnapshot) -> Result<(), TrackerError> {
        snapshot.validate()?;
        self.merge_snapshot(snapshot);
        Ok(())
    }

    fn merge_snapshot(&mut self, snapshot: CatalogSnapshot) {
        for category in snapshot.categories {
            self.add_category(category.id, category.name);
        }
        for course in snapshot.courses {
            self.add_course(course);
        }
        for enrollment in snapshot.enrollments {
            self.enroll(enrollment.user, enrollment.course, enrollment.time_enrolled);
        }
        for criterion in snapshot.criteria {
            self.add_criterion(criterion.id, criterion.course);
        }
        for row in snapshot.criterion_completions {
            self.ledger
                .insert((row.user, row.course, row.criterion), row.time_completed);
        }
        for record in snapshot.completions {
            self.set_completion_record(record);
        }
    }

    /// Dump the catalog as a snapshot, ordered by key.
    #[must_use]
    pub fn to_snapshot(&self) -> CatalogSnapshot {
        CatalogSnapshot {
            categories: self
                .categories
                .iter()
                .map(|(id, name)| Category {
                    id: *id,
                    name: name.clone(),
                })
                .collect(),
            courses: self.courses.values().cloned().collect(),
            enrollments: self
                .enrollments
                .iter()
                .map(|((user, course), time)| Enrollment {
                    user: *user,
                    course: *course,
                    time_enrolled: *time,
                })
                .collect(),
            criteria: self
                .course_criteria
                .iter()
                .map(|(course, id)| CompletionCriterion {
                    id: *id,
                    course: *course,
                })
                .collect(),
            criterion_completions: self
                .ledger
                .iter()
                .map(|((user, course, criterion), time)| CriterionCompletion {
                    user: *user,
                    course: *course,
                    criterion: *criterion,
                    time_completed: *time,
                })
                .collect(),
            completions: self.completions.values().copied().collect(),
        }
    }
}

impl CourseDataGateway for Catalog {
    fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, TrackerError> {
        let mut courses = Vec::new();
        for (_, course_id) in self
            .enrollments
            .range((user, CourseId(0))..=(user, CourseId(u64::MAX)))
            .map(|(key, _)| key)
        {
            let course = self.courses.get(course_id).ok_or_else(|| {
                TrackerError::MalformedRecord(format!("enrollment references unknown {course_id}"))
            })?;
            courses.push(course.clone());
        }
        Ok(courses)
    }

    fn completion_count(&self, user: UserId) -> Result<u64, TrackerError> {
        let first = (user, CourseId(0), CriterionId(0));
        let last = (user, CourseId(u64::MAX), CriterionId(u64::MAX));
        Ok(self.ledger.range(first..=last).count() as u64)
    }

    fn has_completion_criteria(&self, course: CourseId) -> Result<bool, TrackerError> {
        Ok(self
            .course_criteria
            .range((course, CriterionId(0))..=(course, CriterionId(u64::MAX)))
            .next()
            .is_some())
    }

    fn in_progress_rows(&self, user: UserId) -> Result<Vec<InProgressRow>, TrackerError> {
        let rows = self
            .completions
            .range((user, CourseId(0))..=(user, CourseId(u64::MAX)))
            .map(|(_, record)| record)
            .filter(|record| record.is_in_progress())
            .filter_map(|record| {
                // Inner join: records for deleted courses drop out.
                let course = self.courses.get(&record.course)?;
                Some(InProgressRow {
                    course_id: course.id,
                    category: course.category,
                    display_name: course.display_name.clone(),
                    time_enrolled: record.time_enrolled.unwrap_or_default(),
                })
            })
            .collect();
        Ok(rows)
    }

    fn category_name(&self, category: CategoryId) -> Result<String, TrackerError> {
        self.categories
            .get(&category)
            .cloned()
            .ok_or_else(|| TrackerError::MalformedRecord(format!("no name for {category}")))
    }

    fn course_display_name(&self, course: CourseId) -> Result<String, TrackerError> {
        self.courses
            .get(&course)
            .map(|c| c.display_name.clone())
            .ok_or_else(|| TrackerError::MalformedRecord(format!("no name for {course}")))
    }
}

// =============================================================================
// TESTS
// =============================================================================
