//! Dashboard HTTP API
//!
//! REST endpoints for the browser frontend, plus the static asset fallback.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use super::types::*;
use super::DashboardState;
use crate::analytics::{QueryError, SpreadReport, WindowSpec};
use crate::types::now_ms;

/// Create the API router with all endpoints
pub fn create_router(state: DashboardState, static_dir: impl AsRef<Path>) -> Router {
    let static_dir = static_dir.as_ref();

    Router::new()
        .route("/api/data", get(get_data))
        .route("/api/health", get(get_health))
        // Frontend assets are referenced as /static/<file>
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .with_state(state)
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

// ─────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────

/// GET /api/data?window=300&mode=samples - Cross-exchange spread report
async fn get_data(
    Query(query): Query<DataQuery>,
    State(state): State<DashboardState>,
) -> Response {
    let window = match WindowSpec::parse(
        query.window.as_deref(),
        query.mode.as_deref(),
        state.default_window,
    ) {
        Ok(window) => window,
        Err(e) => return query_error_response(e),
    };

    match state.query.snapshot(window).await {
        Ok(report) => Json(ApiResponse::success(report)).into_response(),
        Err(e) => query_error_response(e),
    }
}

/// GET /api/health - Feed health and store occupancy
async fn get_health(State(state): State<DashboardState>) -> impl IntoResponse {
    let (instruments, price_capacity, funding_capacity) = {
        let store = state.store.lock().await;
        (
            store.instrument_count(),
            store.price_capacity(),
            store.funding_capacity(),
        )
    };

    Json(ApiResponse::success(HealthResponse {
        feed: state.monitor.snapshot(),
        instruments,
        price_capacity,
        funding_capacity,
        timestamp: now_ms(),
    }))
}

fn query_error_response(error: QueryError) -> Response {
    let status = match error {
        QueryError::InvalidWindow(_) | QueryError::InvalidMode(_) => StatusCode::BAD_REQUEST,
        QueryError::Internal(_) => {
            tracing::error!(error = %error, "Spread report failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ApiResponse::<SpreadReport>::error(error.to_string()))).into_response()
}
