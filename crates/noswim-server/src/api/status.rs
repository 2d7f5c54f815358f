//! Monitoring status endpoints.
//!
//! `/api/status` combines the published session snapshot with what the
//! presenter is currently showing. `/api/map` serves the last map image.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use noswim_core::SessionSnapshot;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::presenter::PresentationState;
use crate::state::SharedState;

const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// Full monitoring status.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Session snapshot published by the monitor.
    pub session: SessionSnapshot,
    /// Alarm, flash, overlay and map state.
    pub presentation: PresentationState,
}

/// Get monitoring status.
#[utoipa::path(
    get,
    path = "/api/status",
    tag = "monitoring",
    operation_id = "getStatus",
    summary = "Get monitoring status",
    description = "Returns the current session: alert state (`UNINITIALIZED`, `SAFE`, \
        `UNSAFE`, `DEGRADED`), cycle count, last fix, last compliance result with zone \
        details when present, last status line, any startup failure, and what the \
        presenter is doing (alarm, flash, overlay).",
    responses(
        (status = 200, description = "Current status", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        session: state.session(),
        presentation: state.presenter().state(),
    })
}

/// Get the latest map snapshot.
#[utoipa::path(
    get,
    path = "/api/map",
    tag = "monitoring",
    operation_id = "getMap",
    summary = "Get latest map image",
    description = "Returns the raw image of the most recent successful map snapshot. \
        A failed fetch keeps the previous image.",
    responses(
        (status = 200, description = "Map image", body = Vec<u8>, content_type = "image/png"),
        (status = 404, description = "No image yet", body = ErrorResponse)
    )
)]
pub async fn get_map(State(state): State<SharedState>) -> ApiResult<Response> {
    let snapshot = state.presenter().map_image().ok_or_else(|| ApiError::NotFound {
        error_code: "map_unavailable".to_string(),
        message: "No map snapshot has been received yet".to_string(),
    })?;

    let content_type = snapshot
        .content_type
        .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string());
    Ok(([(header::CONTENT_TYPE, content_type)], snapshot.bytes).into_response())
}
