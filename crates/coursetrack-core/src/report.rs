//! # Drill-down Reports
//!
//! Read-only projections behind the dashboard counts. Both reports carry data
//! only; turning a [`CourseLink`] into a URL or a heading key into text is the
//! host's job.
//!
//! The in-progress report reads completion records directly and does not
//! exclude courses without completion criteria, so its row count can differ
//! from the classifier's in-progress count.

use crate::{CategoryId, CourseDataGateway, CourseId, Timestamp, TrackerError, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// COLUMNS
// =============================================================================

/// Column layout hint for a report table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportColumn {
    /// Localization key for the heading.
    pub heading_key: &'static str,
    /// Relative width in percent, when the table fixes one.
    pub width_percent: Option<u8>,
    pub align: ColumnAlign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnAlign {
    Left,
    Center,
}

const SEQUENCE_COLUMN: ReportColumn = ReportColumn {
    heading_key: "s_no",
    width_percent: Some(20),
    align: ColumnAlign::Center,
};

const CATEGORY_COLUMN: ReportColumn = ReportColumn {
    heading_key: "module",
    width_percent: Some(35),
    align: ColumnAlign::Left,
};

const COURSE_COLUMN: ReportColumn = ReportColumn {
    heading_key: "course_name",
    width_percent: Some(50),
    align: ColumnAlign::Left,
};

const ENROLLED_AT_COLUMN: ReportColumn = ReportColumn {
    heading_key: "timeenrolled",
    width_percent: None,
    align: ColumnAlign::Left,
};

// =============================================================================
// ROWS
// =============================================================================

/// Target of a course link. The host maps it to its own course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseLink {
    pub course_id: CourseId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledCourseRow {
    /// 1-based position in the report.
    pub sequence_number: usize,
    pub category_name: String,
    pub course: CourseLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InProgressCourseRow {
    /// 1-based position in the report.
    pub sequence_number: usize,
    pub category_name: String,
    pub course: CourseLink,
    pub time_enrolled: Timestamp,
}

// =============================================================================
// REPORTS
// =============================================================================

/// Every course the user is enrolled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledCoursesReport {
    pub user: UserId,
    pub rows: Vec<EnrolledCourseRow>,
}

impl EnrolledCoursesReport {
    pub const COLUMNS: [ReportColumn; 3] = [SEQUENCE_COLUMN, CATEGORY_COLUMN, COURSE_COLUMN];

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Courses with an enrollment time and no completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InProgressCoursesReport {
    pub user: UserId,
    pub rows: Vec<InProgressCourseRow>,
}

impl InProgressCoursesReport {
    pub const COLUMNS: [ReportColumn; 4] = [
        SEQUENCE_COLUMN,
        CATEGORY_COLUMN,
        COURSE_COLUMN,
        ENROLLED_AT_COLUMN,
    ];

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

/// Category names looked up once per report.
struct CategoryNames<'a, G> {
    gateway: &'a G,
    names: BTreeMap<CategoryId, String>,
}

impl<'a, G: CourseDataGateway> CategoryNames<'a, G> {
    fn new(gateway: &'a G) -> Self {
        Self {
            gateway,
            names: BTreeMap::new(),
        }
    }

    fn get(&mut self, category: CategoryId) -> Result<String, TrackerError> {
        if let Some(name) = self.names.get(&category) {
            return Ok(name.clone());
        }
        let name = self.gateway.category_name(category)?;
        self.names.insert(category, name.clone());
        Ok(name)
    }
}

/// Build the enrolled-courses report, in enrollment order.
pub fn enrolled_courses_report<G: CourseDataGateway>(
    gateway: &G,
    user: UserId,
) -> Result<EnrolledCoursesReport, TrackerError> {
    let courses = gateway.enrolled_courses(user)?;
    let mut categories = CategoryNames::new(gateway);

    let mut rows = Vec::with_capacity(courses.len());
    for (index, course) in courses.iter().enumerate() {
        rows.push(EnrolledCourseRow {
            sequence_number: index + 1,
            category_name: categories.get(course.category)?,
            course: CourseLink {
                course_id: course.id,
                label: gateway.course_display_name(course.id)?,
            },
        });
    }

    Ok(EnrolledCoursesReport { user, rows })
}

/// Build the in-progress report from completion records.
pub fn in_progress_courses_report<G: CourseDataGateway>(
    gateway: &G,
    user: UserId,
) -> Result<InProgressCoursesReport, TrackerError> {
    let in_progress = gateway.in_progress_rows(user)?;
    let mut categories = CategoryNames::new(gateway);

    let mut rows = Vec::with_capacity(in_progress.len());
    for (index, row) in in_progress.into_iter().enumerate() {
        rows.push(InProgressCourseRow {
            sequence_number: index + 1,
            category_name: categories.get(row.category)?,
            course: CourseLink {
                course_id: row.course_id,
                label: row.display_name,
            },
            time_enrolled: row.time_enrolled,
        });
    }

    Ok(InProgressCoursesReport { user, rows })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Catalog, Course, CourseStatusClassifier, CriterionId};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.add_category(CategoryId(1), "Mathematics");
        catalog.add_category(CategoryId(2), "Languages");
        catalog.add_course(Course::new(CourseId(10), CategoryId(1), "Algebra"));
        catalog.add_course(Course::new(CourseId(20), CategoryId(2), "French"));
        catalog.add_course(Course::new(CourseId(30), CategoryId(1), "Geometry"));
        catalog
    }

    #[test]
    fn enrolled_report_numbers_rows_from_one() {
        let mut catalog = catalog();
        let user = UserId(1);
        catalog.enroll(user, CourseId(10), Timestamp(100));
        catalog.enroll(user, CourseId(20), Timestamp(100));

        let report = enrolled_courses_report(&catalog, user).expect("report");

        assert_eq!(report.len(), 2);
        assert_eq!(report.rows[0].sequence_number, 1);
        assert_eq!(report.rows[1].sequence_number, 2);
        assert_eq!(report.rows[0].category_name, "Mathematics");
        assert_eq!(report.rows[1].course.label, "French");
    }

    #[test]
    fn enrolled_report_matches_enrolled_count() {
        let mut catalog = catalog();
        let user = UserId(2);
        for id in [10, 20, 30] {
            catalog.enroll(user, CourseId(id), Timestamp(100));
        }

        let report = enrolled_courses_report(&catalog, user).expect("report");
        let result = CourseStatusClassifier::new(&catalog)
            .classify(user)
            .expect("classify");

        assert_eq!(report.len() as u64, result.enrolled);
    }

    #[test]
    fn empty_user_gets_empty_reports() {
        let catalog = catalog();
        assert!(enrolled_courses_report(&catalog, UserId(99)).expect("report").is_empty());
        assert!(in_progress_courses_report(&catalog, UserId(99)).expect("report").is_empty());
    }

    #[test]
    fn in_progress_report_includes_courses_without_criteria() {
        let mut catalog = catalog();
        let user = UserId(3);
        catalog.enroll(user, CourseId(10), Timestamp(100));
        catalog.enroll(user, CourseId(20), Timestamp(100));
        catalog.add_criterion(CriterionId(1), CourseId(10));
        catalog.start_tracking(user, CourseId(10), Timestamp(100));
        catalog.start_tracking(user, CourseId(20), Timestamp(100));

        let report = in_progress_courses_report(&catalog, user).expect("report");
        let result = CourseStatusClassifier::new(&catalog)
            .classify(user)
            .expect("classify");

        assert_eq!(report.len(), 2);
        assert_eq!(result.in_progress, 1);
        assert_ne!(report.len() as i64, result.in_progress);
        assert_eq!(report.rows[1].time_enrolled, Timestamp(100));
    }

    #[test]
    fn unknown_category_is_malformed() {
        let mut catalog = Catalog::new();
        catalog.add_course(Course::new(CourseId(1), CategoryId(77), "Orphan"));
        catalog.enroll(UserId(1), CourseId(1), Timestamp(100));

        let err = enrolled_courses_report(&catalog, UserId(1)).expect_err("missing category");
        assert!(matches!(err, TrackerError::MalformedRecord(_)));
    }

    #[test]
    fn column_layout_follows_table_widths() {
        let widths: Vec<Option<u8>> = EnrolledCoursesReport::COLUMNS
            .iter()
            .map(|c| c.width_percent)
            .collect();
        assert_eq!(widths, vec![Some(20), Some(35), Some(50)]);
        assert_eq!(InProgressCoursesReport::COLUMNS[3].width_percent, None);
        assert_eq!(InProgressCoursesReport::COLUMNS[3].heading_key, "timeenrolled");
    }
}
