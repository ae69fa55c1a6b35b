//! # Dashboard
//!
//! One dashboard render for one user. A [`Dashboard`] owns its injected
//! dependencies (gateway, current user, feature flags) and memoizes what it
//! computes, so asking for the same view twice in a request costs one set of
//! lookups. Build a new `Dashboard` per request; nothing is shared across them.
//!
//! When completion tracking is disabled the classifier is never invoked and
//! the view is [`DashboardView::Disabled`].

use crate::report::{
    EnrolledCoursesReport, InProgressCoursesReport, enrolled_courses_report,
    in_progress_courses_report,
};
use crate::{ClassificationResult, CourseDataGateway, CourseStatusClassifier, TrackerError, UserId};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;

// =============================================================================
// INJECTED CONTEXT
// =============================================================================

/// Host feature switches, read once when the dashboard is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub completion_tracking_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            completion_tracking_enabled: true,
        }
    }
}

/// The user the dashboard is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
}

impl CurrentUser {
    #[must_use]
    pub const fn new(id: UserId) -> Self {
        Self { id }
    }
}

// =============================================================================
// VIEW
// =============================================================================

/// Which drill-down report a dashboard count opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// The enrolled-courses list.
    Enrolled,
    /// The completion progress list.
    Progress,
}

/// A dashboard count and the report it links to, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric<T> {
    pub value: T,
    pub drill_down: Option<ReportKind>,
}

/// The four counts as the dashboard shows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub user: UserId,
    pub enrolled: Metric<u64>,
    pub completed: Metric<u64>,
    pub in_progress: Metric<i64>,
    pub criteria_undefined: Metric<u64>,
    /// `false` when the in-progress count came out negative.
    pub consistent: bool,
}

impl DashboardSummary {
    /// Lay out a classification. Enrolled and completed only link when
    /// non-zero; the derived counts always link to the progress list.
    #[must_use]
    pub fn from_classification(result: &ClassificationResult) -> Self {
        Self {
            user: result.user,
            enrolled: Metric {
                value: result.enrolled,
                drill_down: (result.enrolled > 0).then_some(ReportKind::Enrolled),
            },
            completed: Metric {
                value: result.completed,
                drill_down: (result.completed > 0).then_some(ReportKind::Progress),
            },
            in_progress: Metric {
                value: result.in_progress,
                drill_down: Some(ReportKind::Progress),
            },
            criteria_undefined: Metric {
                value: result.criteria_undefined,
                drill_down: Some(ReportKind::Progress),
            },
            consistent: result.is_consistent(),
        }
    }
}

/// What the host renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardView {
    /// Completion tracking is switched off; show the settings notice.
    Disabled,
    Summary(DashboardSummary),
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Request-scoped dashboard context.
#[derive(Debug)]
pub struct Dashboard<G> {
    classifier: CourseStatusClassifier<G>,
    user: CurrentUser,
    flags: FeatureFlags,
    classification: OnceCell<ClassificationResult>,
    enrolled_report: OnceCell<EnrolledCoursesReport>,
    in_progress_report: OnceCell<InProgressCoursesReport>,
}

impl<G: CourseDataGateway> Dashboard<G> {
    #[must_use]
    pub fn new(gateway: G, user: CurrentUser, flags: FeatureFlags) -> Self {
        Self {
            classifier: CourseStatusClassifier::new(gateway),
            user,
            flags,
            classification: OnceCell::new(),
            enrolled_report: OnceCell::new(),
            in_progress_report: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn user(&self) -> CurrentUser {
        self.user
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.flags.completion_tracking_enabled
    }

    /// The classification, computed on first use. `None` when disabled.
    pub fn classification(&self) -> Result<Option<&ClassificationResult>, TrackerError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        if let Some(result) = self.classification.get() {
            return Ok(Some(result));
        }
        let result = self.classifier.classify(self.user.id)?;
        Ok(Some(self.classification.get_or_init(|| result)))
    }

    /// The dashboard view for this request.
    pub fn view(&self) -> Result<DashboardView, TrackerError> {
        Ok(match self.classification()? {
            Some(result) => DashboardView::Summary(DashboardSummary::from_classification(result)),
            None => DashboardView::Disabled,
        })
    }

    /// The enrolled-courses report, built on first use. `None` when disabled.
    pub fn enrolled_report(&self) -> Result<Option<&EnrolledCoursesReport>, TrackerError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        if let Some(report) = self.enrolled_report.get() {
            return Ok(Some(report));
        }
        let report = enrolled_courses_report(self.classifier.gateway(), self.user.id)?;
        Ok(Some(self.enrolled_report.get_or_init(|| report)))
    }

    /// The in-progress report, built on first use. `None` when disabled.
    pub fn in_progress_report(&self) -> Result<Option<&InProgressCoursesReport>, TrackerError> {
        if !self.is_enabled() {
            return Ok(None);
        }
        if let Some(report) = self.in_progress_report.get() {
            return Ok(Some(report));
        }
        let report = in_progress_courses_report(self.classifier.gateway(), self.user.id)?;
        Ok(Some(self.in_progress_report.get_or_init(|| report)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
