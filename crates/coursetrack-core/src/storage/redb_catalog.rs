//! # redb-backed Catalog
//!
//! Disk-backed host tables using the redb embedded database.
//!
//! Composite tuple keys put all rows of one user (or one course) next to each
//! other, so every per-user lookup is a single range scan. Records that carry
//! more than one value are postcard-encoded.
//!
//! Every table is keyed, so importing the same snapshot twice is a no-op.

use crate::formats::CatalogSnapshot;
use crate::{
    CatalogStats, Category, CategoryId, CompletionCriterion, CompletionRecord, Course,
    CourseDataGateway, CourseId, CriterionCompletion, CriterionId, Enrollment, InProgressRow,
    Timestamp, TrackerError, UserId,
};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for categories: CategoryId -> name
const CATEGORIES: TableDefinition<u64, &str> = TableDefinition::new("categories");

/// Table for courses: CourseId -> serialized Course
const COURSES: TableDefinition<u64, &[u8]> = TableDefinition::new("courses");

/// Table for enrollments: (user, course) -> time enrolled
const ENROLLMENTS: TableDefinition<(u64, u64), i64> = TableDefinition::new("enrollments");

/// Table for completion criteria: (course, criterion) -> ()
const CRITERIA: TableDefinition<(u64, u64), ()> = TableDefinition::new("criteria");

/// Table for criterion ownership: criterion -> course
const CRITERION_COURSES: TableDefinition<u64, u64> = TableDefinition::new("criterion_courses");

/// Table for the criteria-completion ledger: (user, course, criterion) -> time completed
const LEDGER: TableDefinition<(u64, u64, u64), i64> =
    TableDefinition::new("criterion_completions");

/// Table for completion records: (user, course) -> serialized CompletionRecord
const COMPLETIONS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("completions");

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TrackerError> {
    postcard::to_allocvec(value).map_err(|e| TrackerError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, TrackerError> {
    postcard::from_bytes(bytes)
        .map_err(|e| TrackerError::MalformedRecord(format!("undecodable {}: {}", what, e)))
}

/// Host tables stored in a redb database.
pub struct RedbCatalog {
    db: Database,
}

impl std::fmt::Debug for RedbCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbCatalog").finish_non_exhaustive()
    }
}

impl RedbCatalog {
    /// Open or create a catalog database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let db = Database::create(path.as_ref()).map_err(TrackerError::unavailable)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(TrackerError::unavailable)?;
            write_txn
                .open_table(CATEGORIES)
                .map_err(TrackerError::unavailable)?;
            write_txn
                .open_table(COURSES)
                .map_err(TrackerError::unavailable)?;
            write_txn
                .open_table(ENROLLMENTS)
                .map_err(TrackerError::unavailable)?;
            write_txn
                .open_table(CRITERIA)
                .map_err(TrackerError::unavailable)?;
            write_txn
                .open_table(CRITERION_COURSES)
                .map_err(TrackerError::unavailable)?;
            write_txn
                .open_table(LEDGER)
                .map_err(TrackerError::unavailable)?;
            write_txn
                .open_table(COMPLETIONS)
                .map_err(TrackerError::unavailable)?;
            write_txn.commit().map_err(TrackerError::unavailable)?;
        }

        Ok(Self { db })
    }

    /// Write a whole snapshot in one ACID transaction.
    ///
    /// The snapshot is validated before the transaction opens; on any error
    /// nothing is written. Records overwrite their earlier versions; a
    /// criterion imported under a new course moves there.
    pub fn import_snapshot(&mut self, snapshot: &CatalogSnapshot) -> Result<(), TrackerError> {
        snapshot.validate()?;

        let write_txn = self.db.begin_write().map_err(TrackerError::unavailable)?;
        {
            let mut categories = write_txn
                .open_table(CATEGORIES)
                .map_err(TrackerError::unavailable)?;
            for category in &snapshot.categories {
                categories
                    .insert(category.id.0, category.name.as_str())
                    .map_err(TrackerError::unavailable)?;
            }

            let mut courses = write_txn
                .open_table(COURSES)
                .map_err(TrackerError::unavailable)?;
            for course in &snapshot.courses {
                let bytes = encode(course)?;
                courses
                    .insert(course.id.0, bytes.as_slice())
                    .map_err(TrackerError::unavailable)?;
            }

            let mut enrollments = write_txn
                .open_table(ENROLLMENTS)
                .map_err(TrackerError::unavailable)?;
            for enrollment in &snapshot.enrollments {
                enrollments
                    .insert(
                        (enrollment.user.0, enrollment.course.0),
                        enrollment.time_enrolled.secs(),
                    )
                    .map_err(TrackerError::unavailable)?;
            }

            let mut criteria = write_txn
                .open_table(CRITERIA)
                .map_err(TrackerError::unavailable)?;
            let mut owners = write_txn
                .open_table(CRITERION_COURSES)
                .map_err(TrackerError::unavailable)?;
            for criterion in &snapshot.criteria {
                let previous = owners
                    .insert(criterion.id.0, criterion.course.0)
                    .map_err(TrackerError::unavailable)?
                    .map(|course| course.value());
                if let Some(previous) = previous {
                    criteria
                        .remove((previous, criterion.id.0))
                        .map_err(TrackerError::unavailable)?;
                }
                criteria
                    .insert((criterion.course.0, criterion.id.0), ())
                    .map_err(TrackerError::unavailable)?;
            }

            let mut ledger = write_txn
                .open_table(LEDGER)
                .map_err(TrackerError::unavailable)?;
            for row in &snapshot.criterion_completions {
                ledger
                    .insert(
                        (row.user.0, row.course.0, row.criterion.0),
                        row.time_completed.secs(),
                    )
                    .map_err(TrackerError::unavailable)?;
            }

            let mut completions = write_txn
                .open_table(COMPLETIONS)
                .map_err(TrackerError::unavailable)?;
            for record in &snapshot.completions {
                let bytes = encode(record)?;
                completions
                    .insert((record.user.0, record.course.0), bytes.as_slice())
                    .map_err(TrackerError::unavailable)?;
            }
        }
        write_txn.commit().map_err(TrackerError::unavailable)?;

        Ok(())
    }

    /// Row counts per table.
    pub fn stats(&self) -> Result<CatalogStats, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;

        let categories = read_txn
            .open_table(CATEGORIES)
            .map_err(TrackerError::unavailable)?
            .len()
            .map_err(TrackerError::unavailable)?;
        let courses = read_txn
            .open_table(COURSES)
            .map_err(TrackerError::unavailable)?
            .len()
            .map_err(TrackerError::unavailable)?;
        let enrollments = read_txn
            .open_table(ENROLLMENTS)
            .map_err(TrackerError::unavailable)?
            .len()
            .map_err(TrackerError::unavailable)?;
        let criteria = read_txn
            .open_table(CRITERIA)
            .map_err(TrackerError::unavailable)?
            .len()
            .map_err(TrackerError::unavailable)?;
        let ledger_rows = read_txn
            .open_table(LEDGER)
            .map_err(TrackerError::unavailable)?
            .len()
            .map_err(TrackerError::unavailable)?;
        let completion_records = read_txn
            .open_table(COMPLETIONS)
            .map_err(TrackerError::unavailable)?
            .len()
            .map_err(TrackerError::unavailable)?;

        Ok(CatalogStats {
            categories: categories as usize,
            courses: courses as usize,
            enrollments: enrollments as usize,
            criteria: criteria as usize,
            ledger_rows: ledger_rows as usize,
            completion_records: completion_records as usize,
        })
    }

    /// Read every table back into a snapshot.
    pub fn to_snapshot(&self) -> Result<CatalogSnapshot, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;
        let mut snapshot = CatalogSnapshot::default();

        let table = read_txn
            .open_table(CATEGORIES)
            .map_err(TrackerError::unavailable)?;
        for entry in table.iter().map_err(TrackerError::unavailable)? {
            let (key, value) = entry.map_err(TrackerError::unavailable)?;
            snapshot.categories.push(Category {
                id: CategoryId(key.value()),
                name: value.value().to_string(),
            });
        }

        let table = read_txn
            .open_table(COURSES)
            .map_err(TrackerError::unavailable)?;
        for entry in table.iter().map_err(TrackerError::unavailable)? {
            let (_, value) = entry.map_err(TrackerError::unavailable)?;
            snapshot.courses.push(decode(value.value(), "course")?);
        }

        let table = read_txn
            .open_table(ENROLLMENTS)
            .map_err(TrackerError::unavailable)?;
        for entry in table.iter().map_err(TrackerError::unavailable)? {
            let (key, value) = entry.map_err(TrackerError::unavailable)?;
            let (user, course) = key.value();
            snapshot.enrollments.push(Enrollment {
                user: UserId(user),
                course: CourseId(course),
                time_enrolled: Timestamp(value.value()),
            });
        }

        let table = read_txn
            .open_table(CRITERIA)
            .map_err(TrackerError::unavailable)?;
        for entry in table.iter().map_err(TrackerError::unavailable)? {
            let (key, _) = entry.map_err(TrackerError::unavailable)?;
            let (course, id) = key.value();
            snapshot.criteria.push(CompletionCriterion {
                id: CriterionId(id),
                course: CourseId(course),
            });
        }

        let table = read_txn
            .open_table(LEDGER)
            .map_err(TrackerError::unavailable)?;
        for entry in table.iter().map_err(TrackerError::unavailable)? {
            let (key, value) = entry.map_err(TrackerError::unavailable)?;
            let (user, course, criterion) = key.value();
            snapshot.criterion_completions.push(CriterionCompletion {
                user: UserId(user),
                course: CourseId(course),
                criterion: CriterionId(criterion),
                time_completed: Timestamp(value.value()),
            });
        }

        let table = read_txn
            .open_table(COMPLETIONS)
            .map_err(TrackerError::unavailable)?;
        for entry in table.iter().map_err(TrackerError::unavailable)? {
            let (_, value) = entry.map_err(TrackerError::unavailable)?;
            snapshot
                .completions
                .push(decode::<CompletionRecord>(value.value(), "completion record")?);
        }

        Ok(snapshot)
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), TrackerError> {
        self.db.compact().map_err(TrackerError::unavailable)?;
        Ok(())
    }

    fn load_course(&self, course: CourseId) -> Result<Option<Course>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;
        let courses = read_txn
            .open_table(COURSES)
            .map_err(TrackerError::unavailable)?;
        courses
            .get(course.0)
            .map_err(TrackerError::unavailable)?
            .map(|data| decode::<Course>(data.value(), "course"))
            .transpose()
    }
}

impl CourseDataGateway for RedbCatalog {
    fn enrolled_courses(&self, user: UserId) -> Result<Vec<Course>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;
        let enrollments = read_txn
            .open_table(ENROLLMENTS)
            .map_err(TrackerError::unavailable)?;
        let courses_table = read_txn
            .open_table(COURSES)
            .map_err(TrackerError::unavailable)?;

        let mut courses = Vec::new();
        for entry in enrollments
            .range((user.0, 0u64)..=(user.0, u64::MAX))
            .map_err(TrackerError::unavailable)?
        {
            let (key, _) = entry.map_err(TrackerError::unavailable)?;
            let (_user, course_id) = key.value();
            let data = courses_table
                .get(course_id)
                .map_err(TrackerError::unavailable)?
                .ok_or_else(|| {
                    TrackerError::MalformedRecord(format!(
                        "enrollment references unknown {}",
                        CourseId(course_id)
                    ))
                })?;
            courses.push(decode(data.value(), "course")?);
        }
        Ok(courses)
    }

    fn completion_count(&self, user: UserId) -> Result<u64, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;
        let ledger = read_txn
            .open_table(LEDGER)
            .map_err(TrackerError::unavailable)?;

        let mut count = 0u64;
        for entry in ledger
            .range((user.0, 0u64, 0u64)..=(user.0, u64::MAX, u64::MAX))
            .map_err(TrackerError::unavailable)?
        {
            entry.map_err(TrackerError::unavailable)?;
            count += 1;
        }
        Ok(count)
    }

    fn has_completion_criteria(&self, course: CourseId) -> Result<bool, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;
        let criteria = read_txn
            .open_table(CRITERIA)
            .map_err(TrackerError::unavailable)?;

        let mut range = criteria
            .range((course.0, 0u64)..=(course.0, u64::MAX))
            .map_err(TrackerError::unavailable)?;
        match range.next() {
            Some(entry) => {
                entry.map_err(TrackerError::unavailable)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn in_progress_rows(&self, user: UserId) -> Result<Vec<InProgressRow>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;
        let completions = read_txn
            .open_table(COMPLETIONS)
            .map_err(TrackerError::unavailable)?;
        let courses_table = read_txn
            .open_table(COURSES)
            .map_err(TrackerError::unavailable)?;

        let mut rows = Vec::new();
        for entry in completions
            .range((user.0, 0u64)..=(user.0, u64::MAX))
            .map_err(TrackerError::unavailable)?
        {
            let (_, value) = entry.map_err(TrackerError::unavailable)?;
            let record: CompletionRecord = decode(value.value(), "completion record")?;
            if !record.is_in_progress() {
                continue;
            }
            // Inner join: records for deleted courses drop out.
            let Some(data) = courses_table
                .get(record.course.0)
                .map_err(TrackerError::unavailable)?
            else {
                continue;
            };
            let course: Course = decode(data.value(), "course")?;
            rows.push(InProgressRow {
                course_id: course.id,
                category: course.category,
                display_name: course.display_name,
                time_enrolled: record.time_enrolled.unwrap_or_default(),
            });
        }
        Ok(rows)
    }

    fn category_name(&self, category: CategoryId) -> Result<String, TrackerError> {
        let read_txn = self.db.begin_read().map_err(TrackerError::unavailable)?;
        let categories = read_txn
            .open_table(CATEGORIES)
            .map_err(TrackerError::unavailable)?;
        categories
            .get(category.0)
            .map_err(TrackerError::unavailable)?
            .map(|name| name.value().to_string())
            .ok_or_else(|| TrackerError::MalformedRecord(format!("no name for {category}")))
    }

    fn course_display_name(&self, course: CourseId) -> Result<String, TrackerError> {
        self.load_course(course)?
            .map(|c| c.display_name)
            .ok_or_else(|| TrackerError::MalformedRecord(format!("no name for {course}")))
    }
}
