//! # Store
//!
//! The storage backend a running service reads from.
//!
//! - `InMemory`: a [`Catalog`] (fast, volatile unless saved as a snapshot file)
//! - `Persistent`: a [`RedbCatalog`] for disk-backed ACID storage
//!
//! Both answer the same [`CourseDataGateway`] lookups.

use crate::formats::CatalogSnapshot;
use crate::storage::RedbCatalog;
use crate::{
    Catalog, CatalogStats, CategoryId, Course, CourseDataGateway, CourseId, InProgressRow,
    TrackerError, UserId,
};
use std::path::Path;

/// Storage backend for the tracker.
#[derive(Debug)]
pub enum Store {
    /// In-memory catalog.
    InMemory(Catalog),
    /// Disk-backed catalog using redb.
    Persistent(RedbCatalog),
}

impl Default for Store {
    fn default() -> Self {
        Self::InMemory(Catalog::new())
    }
}

impl Store {
    /// Empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or create a redb store at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        Ok(Self::Persistent(RedbCatalog::open(path)?))
    }

    #[must_use]
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::InMemory(catalog)
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    /// The in-memory catalog, `None` for persistent stores.
    #[must_use]
    pub fn catalog_opt(&self) -> Option<&Catalog> {
        match self {
            Self::InMemory(catalog) => Some(catalog),
            Self::Persistent(_) => None,
        }
    }

    /// Validate and load a snapshot into the store.
    pub fn import(&mut self, snapshot: CatalogSnapshot) -> Result<(), TrackerError> {
        match self {
            Self::InMemory(catalog) => catalog.import_snapshot(snapshot),
            Self::Persistent(redb) => redb.import_snapshot(&snapshot),
        }
    }

    pub fn stats(&self) -> Result<CatalogStats, TrackerError> {
        match self {
            Self::InMemory(catalog) => Ok(catalog.stats()),
            Self::Persistent(redb) => redb.stats(),
        }
    }

    pub fn to_snapshot(&self) -> Result<CatalogSnapshot, TrackerError> {
        match self {
            Self::InMemory(catalog) => Ok(catalog.to_snapshot()),
            Self::Persistent(redb) => redb.to_snapshot(),
        }
    }
}

impl CourseDataGateway for Store {
    fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, TrackerError> {
        match self {
            Self::InMemory(catalog) => catalog.enrolled_courses(user),
            Self::Persistent(redb) => redb.enrolled_courses(user),
        }
    }

    fn completion_count(&self, user: UserId) -> Result<u64, TrackerError> {
        match self {
            Self::InMemory(catalog) => catalog.completion_count(user),
            Self::Persistent(redb) => redb.completion_count(user),
        }
    }

    fn has_completion_criteria(&self, course: CourseId) -> Result<bool, TrackerError> {
        match self {
            Self::InMemory(catalog) => catalog.has_completion_criteria(course),
            Self::Persistent(redb) => redb.has_completion_criteria(course),
        }
    }

    fn in_progress_rows(&self, user: UserId) -> Result<Vec<InProgressRow>, TrackerError> {
        match self {
            Self::InMemory(catalog) => catalog.in_progress_rows(user),
            Self::Persistent(redb) => redb.in_progress_rows(user),
        }
    }

    fn category_name(&self, category: CategoryId) -> Result<String, TrackerError> {
        match self {
            Self::InMemory(catalog) => catalog.category_name(category),
            Self::Persistent(redb) => redb.category_name(category),
        }
    }

    fn course_display_name(&self, course: CourseId) -> Result<String, TrackerError> {
        match self {
            Self::InMemory(catalog) => catalog.course_display_name(course),
            Self::Persistent(redb) => redb.course_display_name(course),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Category, CompletionCriterion, CourseStatusClassifier, CriterionCompletion, CriterionId,
        Enrollment, Timestamp,
    };
    use tempfile::tempdir;

    fn snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            categories: vec![Category {
                id: CategoryId(1),
                name: "History".to_string(),
            }],
            courses: vec![Course::new(CourseId(4), CategoryId(1), "Rome")],
            enrollments: vec![Enrollment {
                user: UserId(2),
                course: CourseId(4),
                time_enrolled: Timestamp(10),
            }],
            ..CatalogSnapshot::default()
        }
    }

    #[test]
    fn default_store_is_in_memory() {
        let store = Store::new();
        assert!(!store.is_persistent());
        assert!(store.catalog_opt().is_some());
    }

    #[test]
    fn in_memory_import_rejects_invalid_snapshot() {
        let mut store = Store::new();
        let mut bad = snapshot();
        bad.courses.clear();
        assert!(matches!(
            store.import(bad),
            Err(TrackerError::InvalidSnapshot(_))
        ));
        assert_eq!(store.stats().expect("stats"), CatalogStats::default());
    }

    #[test]
    fn both_backends_answer_alike() {
        let temp = tempdir().expect("temp dir");
        let mut memory = Store::new();
        let mut disk = Store::with_redb(temp.path().join("store.redb")).expect("open");
        assert!(disk.is_persistent());
        assert!(disk.catalog_opt().is_none());

        memory.import(snapshot()).expect("import");
        disk.import(snapshot()).expect("import");

        assert_eq!(
            memory.enrolled_courses(UserId(2)).expect("lookup"),
            disk.enrolled_courses(UserId(2)).expect("lookup")
        );
        assert_eq!(
            memory.stats().expect("stats"),
            disk.stats().expect("stats")
        );
        assert_eq!(
            memory.to_snapshot().expect("snapshot"),
            disk.to_snapshot().expect("snapshot")
        );
    }

    fn both_stores(temp: &tempfile::TempDir) -> Vec<(&'static str, Store)> {
        vec![
            ("memory", Store::new()),
            (
                "redb",
                Store::with_redb(temp.path().join("both.redb")).expect("open"),
            ),
        ]
    }

    fn with_criterion_on(course: CourseId) -> CatalogSnapshot {
        let mut snap = snapshot();
        snap.courses
            .push(Course::new(CourseId(5), CategoryId(1), "Carthage"));
        snap.criteria.push(CompletionCriterion {
            id: CriterionId(1),
            course,
        });
        snap
    }

    #[test]
    fn moved_criterion_survives_export_and_reload() {
        let temp = tempdir().expect("temp dir");
        for (name, mut store) in both_stores(&temp) {
            store.import(with_criterion_on(CourseId(4))).expect("first import");
            store.import(with_criterion_on(CourseId(5))).expect("second import");

            assert!(!store.has_completion_criteria(CourseId(4)).expect("lookup"), "{name}");
            assert!(store.has_completion_criteria(CourseId(5)).expect("lookup"), "{name}");

            let exported = store.to_snapshot().expect("export");
            assert_eq!(exported.criteria.len(), 1, "{name}");
            let reloaded = Catalog::from_snapshot(exported.clone()).expect("reload");
            assert_eq!(reloaded.stats().criteria, 1, "{name}");

            let fresh = temp.path().join(format!("{name}-copy.redb"));
            Store::with_redb(fresh)
                .expect("open copy")
                .import(exported)
                .expect("import export");
        }
    }

    #[test]
    fn reimporting_an_export_leaves_counts_unchanged() {
        let temp = tempdir().expect("temp dir");
        let mut snap = with_criterion_on(CourseId(4));
        snap.criterion_completions.push(CriterionCompletion {
            user: UserId(2),
            course: CourseId(4),
            criterion: CriterionId(1),
            time_completed: Timestamp(20),
        });
        // A row for a course the user has left still counts.
        snap.criterion_completions.push(CriterionCompletion {
            user: UserId(2),
            course: CourseId(77),
            criterion: CriterionId(8),
            time_completed: Timestamp(5),
        });

        for (name, mut store) in both_stores(&temp) {
            store.import(snap.clone()).expect("import");
            let first = CourseStatusClassifier::new(&store)
                .classify(UserId(2))
                .expect("classify");
            assert_eq!(first.completed, 2, "{name}");
            assert_eq!(first.in_progress, -1, "{name}");

            let exported = store.to_snapshot().expect("export");
            store.import(exported.clone()).expect("reimport");
            let second = CourseStatusClassifier::new(&store)
                .classify(UserId(2))
                .expect("classify");
            assert_eq!(second, first, "{name}");
            assert_eq!(store.to_snapshot().expect("export"), exported, "{name}");
        }
    }
}
