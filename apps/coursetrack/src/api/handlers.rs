//! # API Endpoint Handlers
//!
//! Every user-scoped handler builds a fresh [`Dashboard`] over the shared
//! store, so memoized results never outlive the request.

use super::{
    AppState,
    types::{
        ApiError, DashboardResponse, EnrolledReportResponse, HealthResponse, ImportResponse,
        InProgressReportResponse, StatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use coursetrack_core::{CatalogSnapshot, CurrentUser, Dashboard, UserId};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Store statistics and the active feature flags.
pub async fn status_handler(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let store = state.store.read().await;
    let stats = store.stats()?;

    Ok(Json(StatusResponse {
        persistent: store.is_persistent(),
        completion_tracking_enabled: state.flags.completion_tracking_enabled,
        stats,
    }))
}

// =============================================================================
// DASHBOARD HANDLERS
// =============================================================================

/// The four counts for a user.
pub async fn dashboard_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let user = UserId(user_id);
    let store = state.store.read().await;
    let dashboard = Dashboard::new(&*store, CurrentUser::new(user), state.flags);

    let view = dashboard.view()?;
    Ok(Json(DashboardResponse::from_view(user, view)))
}

/// Drill-down list behind the enrolled count.
pub async fn enrolled_report_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<EnrolledReportResponse>, ApiError> {
    let user = UserId(user_id);
    let store = state.store.read().await;
    let dashboard = Dashboard::new(&*store, CurrentUser::new(user), state.flags);

    let report = dashboard.enrolled_report()?;
    Ok(Json(EnrolledReportResponse::new(user, report)))
}

/// Drill-down list behind the progress counts.
pub async fn in_progress_report_handler(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<InProgressReportResponse>, ApiError> {
    let user = UserId(user_id);
    let store = state.store.read().await;
    let dashboard = Dashboard::new(&*store, CurrentUser::new(user), state.flags);

    let report = dashboard.in_progress_report()?;
    Ok(Json(InProgressReportResponse::new(user, report)))
}

// =============================================================================
// IMPORT HANDLER
// =============================================================================

/// Load a catalog snapshot into the running store.
pub async fn import_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<CatalogSnapshot>,
) -> Result<Json<ImportResponse>, ApiError> {
    let records = snapshot.record_count();
    let mut store = state.store.write().await;
    store.import(snapshot)?;
    let stats = store.stats()?;

    tracing::info!(records, persistent = store.is_persistent(), "Catalog imported");

    Ok(Json(ImportResponse {
        success: true,
        records,
        stats,
    }))
}
