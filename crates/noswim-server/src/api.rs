//! HTTP API routes and handlers.
//!
//! - `health` - Service health checks
//! - `status` - Monitoring status and map image
//! - `log` - Session log view, clear and share
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

pub mod error;
pub mod health;
pub mod log;
pub mod openapi;
pub mod status;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /api
/// ├── /status            - Alert state, last fix, last result, presentation
/// ├── /map               - Latest map image
/// ├── /log               - Log view, /clear, /share
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/status", get(status::get_status))
                .route("/map", get(status::get_map))
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/log", log::router()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
