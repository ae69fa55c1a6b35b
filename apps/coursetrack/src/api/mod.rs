//! # HTTP API
//!
//! The dashboard and its drill-down reports over axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Store statistics
//! - `GET /users/{user_id}/dashboard` - The four counts
//! - `GET /users/{user_id}/reports/enrolled` - Enrolled-courses list
//! - `GET /users/{user_id}/reports/in-progress` - In-progress list
//! - `POST /catalog/import` - Load a catalog snapshot
//!
//! ## Environment
//!
//! - `COURSETRACK_CORS_ORIGINS`: comma-separated origins, or `*` (default: localhost only)
//! - `COURSETRACK_RATE_LIMIT`: requests per second (default: 100, 0 to disable)
//! - `COURSETRACK_API_KEY`: if set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use handlers::{
    dashboard_handler, enrolled_report_handler, health_handler, import_handler,
    in_progress_report_handler, status_handler,
};
pub use middleware::{RATE_LIMIT_ENV, create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ApiError, COMPLETION_DISABLED_NOTICE, ColumnJson, DashboardResponse, EnrolledReportResponse,
    EnrolledRowJson, ErrorResponse, HealthResponse, ImportResponse, InProgressReportResponse,
    InProgressRowJson, StatusResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use coursetrack_core::{FeatureFlags, Store, TrackerError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const CORS_ORIGINS_ENV: &str = "COURSETRACK_CORS_ORIGINS";

/// Request bodies above this size are rejected (snapshot imports included).
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    /// Read once at startup and injected into every dashboard.
    pub flags: FeatureFlags,
}

impl AppState {
    #[must_use]
    pub fn new(store: Store, flags: FeatureFlags) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            flags,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// CORS from `COURSETRACK_CORS_ORIGINS`; localhost only when unset.
fn build_cors_layer() -> CorsLayer {
    match std::env::var(CORS_ORIGINS_ENV).ok().as_deref() {
        Some("*") => {
            tracing::warn!("CORS: allowing all origins ({}=*)", CORS_ORIGINS_ENV);
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => {
                        tracing::info!("CORS: allowing origin {}", origin);
                        Some(value)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();

            if allowed.is_empty() {
                tracing::warn!(
                    "CORS: no valid origins in {}, using localhost only",
                    CORS_ORIGINS_ENV
                );
                localhost_cors()
            } else {
                restricted_cors(allowed)
            }
        }
        None => localhost_cors(),
    }
}

fn localhost_cors() -> CorsLayer {
    let origins = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();
    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Build the router with all endpoints and middleware.
///
/// Layers, outermost first: tracing, CORS, body limit, rate limiting,
/// authentication.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication disabled; set {} to require a Bearer token",
            API_KEY_ENV
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/users/{user_id}/dashboard", get(handlers::dashboard_handler))
        .route(
            "/users/{user_id}/reports/enrolled",
            get(handlers::enrolled_report_handler),
        )
        .route(
            "/users/{user_id}/reports/in-progress",
            get(handlers::in_progress_report_handler),
        )
        .route("/catalog/import", post(handlers::import_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind and serve until the process is stopped.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), TrackerError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TrackerError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("coursetrack HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| TrackerError::Io(format!("Server error: {}", e)))
}
