//! # API Request/Response Types
//!
//! JSON bodies for the HTTP API. Report rows are flattened here so clients
//! get plain ids and a ready-made enrollment date.

use crate::dates;
use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use coursetrack_core::{
    CatalogStats, DashboardSummary, DashboardView, EnrolledCoursesReport, InProgressCoursesReport,
    TrackerError, UserId,
    report::{ColumnAlign, ReportColumn},
};
use serde::{Deserialize, Serialize};

/// Localization key shown in place of the counts when tracking is off.
pub const COMPLETION_DISABLED_NOTICE: &str = "coursecompletion_setting";

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub persistent: bool,
    pub completion_tracking_enabled: bool,
    #[serde(flatten)]
    pub stats: CatalogStats,
}

// =============================================================================
// DASHBOARD RESPONSE
// =============================================================================

/// Dashboard counts for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub user_id: u64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DashboardSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl DashboardResponse {
    #[must_use]
    pub fn from_view(user: UserId, view: DashboardView) -> Self {
        match view {
            DashboardView::Summary(summary) => Self {
                user_id: user.0,
                enabled: true,
                summary: Some(summary),
                notice: None,
            },
            DashboardView::Disabled => Self {
                user_id: user.0,
                enabled: false,
                summary: None,
                notice: Some(COMPLETION_DISABLED_NOTICE.to_string()),
            },
        }
    }
}

// =============================================================================
// REPORT RESPONSES
// =============================================================================

/// Column layout hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnJson {
    pub heading_key: String,
    pub width_percent: Option<u8>,
    pub align: String,
}

impl From<&ReportColumn> for ColumnJson {
    fn from(column: &ReportColumn) -> Self {
        let align = match column.align {
            ColumnAlign::Left => "left",
            ColumnAlign::Center => "center",
        };
        Self {
            heading_key: column.heading_key.to_string(),
            width_percent: column.width_percent,
            align: align.to_string(),
        }
    }
}

fn columns(layout: &[ReportColumn]) -> Vec<ColumnJson> {
    layout.iter().map(ColumnJson::from).collect()
}

/// One enrolled course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledRowJson {
    pub sequence_number: usize,
    pub category_name: String,
    pub course_id: u64,
    pub course_name: String,
}

/// One course with an open completion record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InProgressRowJson {
    pub sequence_number: usize,
    pub category_name: String,
    pub course_id: u64,
    pub course_name: String,
    /// Unix seconds as stored.
    pub time_enrolled: i64,
    /// RFC 2822 rendering of `time_enrolled`.
    pub enrolled_at: Option<String>,
}

/// Enrolled-courses report. `rows` is empty and `enabled` false when
/// completion tracking is off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledReportResponse {
    pub user_id: u64,
    pub enabled: bool,
    pub columns: Vec<ColumnJson>,
    pub rows: Vec<EnrolledRowJson>,
}

impl EnrolledReportResponse {
    #[must_use]
    pub fn new(user: UserId, report: Option<&EnrolledCoursesReport>) -> Self {
        let rows = report
            .map(|report| {
                report
                    .rows
                    .iter()
                    .map(|row| EnrolledRowJson {
                        sequence_number: row.sequence_number,
                        category_name: row.category_name.clone(),
                        course_id: row.course.course_id.0,
                        course_name: row.course.label.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            user_id: user.0,
            enabled: report.is_some(),
            columns: columns(&EnrolledCoursesReport::COLUMNS),
            rows,
        }
    }
}

/// In-progress report. Same disabled behavior as the enrolled report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InProgressReportResponse {
    pub user_id: u64,
    pub enabled: bool,
    pub columns: Vec<ColumnJson>,
    pub rows: Vec<InProgressRowJson>,
}

impl InProgressReportResponse {
    #[must_use]
    pub fn new(user: UserId, report: Option<&InProgressCoursesReport>) -> Self {
        let rows = report
            .map(|report| {
                report
                    .rows
                    .iter()
                    .map(|row| InProgressRowJson {
                        sequence_number: row.sequence_number,
                        category_name: row.category_name.clone(),
                        course_id: row.course.course_id.0,
                        course_name: row.course.label.clone(),
                        time_enrolled: row.time_enrolled.secs(),
                        enrolled_at: dates::rfc2822(row.time_enrolled),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            user_id: user.0,
            enabled: report.is_some(),
            columns: columns(&InProgressCoursesReport::COLUMNS),
            rows,
        }
    }
}

// =============================================================================
// IMPORT RESPONSE
// =============================================================================

/// Catalog import response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    /// Records in the imported snapshot.
    pub records: usize,
    #[serde(flatten)]
    pub stats: CatalogStats,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`TrackerError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl From<TrackerError> for ApiError {
    fn from(error: TrackerError) -> Self {
        Self(error)
    }
}

impl ApiError {
    /// Status code for each error kind.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            TrackerError::DataSourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TrackerError::InvalidSnapshot(_) | TrackerError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            TrackerError::MalformedRecord(_) | TrackerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::warn!(error = %self.0, "Request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use coursetrack_core::{
        CourseId, CourseLink, EnrolledCourseRow, InProgressCourseRow, Timestamp,
    };

    #[test]
    fn disabled_dashboard_carries_notice() {
        let response = DashboardResponse::from_view(UserId(3), DashboardView::Disabled);
        assert!(!response.enabled);
        assert!(response.summary.is_none());
        assert_eq!(response.notice.as_deref(), Some(COMPLETION_DISABLED_NOTICE));
    }

    #[test]
    fn enrolled_rows_flatten_links() {
        let report = EnrolledCoursesReport {
            user: UserId(1),
            rows: vec![EnrolledCourseRow {
                sequence_number: 1,
                category_name: "Arts".to_string(),
                course: CourseLink {
                    course_id: CourseId(9),
                    label: "Painting".to_string(),
                },
            }],
        };
        let response = EnrolledReportResponse::new(UserId(1), Some(&report));
        assert!(response.enabled);
        assert_eq!(response.columns.len(), 3);
        assert_eq!(response.columns[0].heading_key, "s_no");
        assert_eq!(response.columns[0].align, "center");
        assert_eq!(response.rows[0].course_id, 9);
        assert_eq!(response.rows[0].course_name, "Painting");
    }

    #[test]
    fn in_progress_rows_render_dates() {
        let report = InProgressCoursesReport {
            user: UserId(1),
            rows: vec![InProgressCourseRow {
                sequence_number: 1,
                category_name: "Arts".to_string(),
                course: CourseLink {
                    course_id: CourseId(9),
                    label: "Painting".to_string(),
                },
                time_enrolled: Timestamp(1_700_000_000),
            }],
        };
        let response = InProgressReportResponse::new(UserId(1), Some(&report));
        assert_eq!(response.columns.len(), 4);
        assert_eq!(response.columns[3].width_percent, None);
        assert_eq!(
            response.rows[0].enrolled_at.as_deref(),
            Some("Tue, 14 Nov 2023 22:13:20 +0000")
        );
    }

    #[test]
    fn missing_report_is_disabled_and_empty() {
        let response = InProgressReportResponse::new(UserId(1), None);
        assert!(!response.enabled);
        assert!(response.rows.is_empty());
        assert_eq!(response.columns.len(), 4);
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (
                TrackerError::DataSourceUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                TrackerError::MalformedRecord("no name".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                TrackerError::InvalidSnapshot("dup".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError(error).status(), expected);
        }
    }
}
