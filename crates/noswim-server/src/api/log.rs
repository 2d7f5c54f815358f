//! Session log endpoints.
//!
//! Read the bounded view of the session log, clear it, or export the
//! durable file.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the log router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_log))
        .route("/clear", post(clear_log))
        .route("/share", post(share_log))
}

/// Bounded log view.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "contents": "[12:00:00.000] === NO-SWIM ZONE CHECKER ===\n",
    "file_path": "/var/lib/noswim/logs/NoSwimLog_20250101_120000.txt"
}))]
pub struct LogResponse {
    /// Rendered view, oldest entry first.
    pub contents: String,
    /// Durable session file, `null` when running view-only.
    pub file_path: Option<String>,
}

/// Result of a share request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShareLogResponse {
    /// File that was handed to the share target.
    pub file_path: String,
}

fn current_view(state: &SharedState) -> LogResponse {
    let log = state.log();
    LogResponse {
        contents: log.contents(),
        file_path: log.file_path().map(|p| p.display().to_string()),
    }
}

/// Get the session log view.
#[utoipa::path(
    get,
    path = "/api/log",
    tag = "log",
    operation_id = "getLog",
    summary = "Get session log",
    description = "Returns the bounded in-memory view of the session log. Older entries \
        are dropped once the view grows past its ceiling; the durable file keeps everything.",
    responses(
        (status = 200, description = "Log view", body = LogResponse)
    )
)]
pub async fn get_log(State(state): State<SharedState>) -> Json<LogResponse> {
    Json(current_view(&state))
}

/// Clear the session log view.
#[utoipa::path(
    post,
    path = "/api/log/clear",
    tag = "log",
    operation_id = "clearLog",
    summary = "Clear log view",
    description = "Resets the in-memory view. The durable file is untouched.",
    responses(
        (status = 200, description = "View after clearing", body = LogResponse)
    )
)]
pub async fn clear_log(State(state): State<SharedState>) -> Json<LogResponse> {
    state.log().clear();
    Json(current_view(&state))
}

/// Share the session log file.
#[utoipa::path(
    post,
    path = "/api/log/share",
    tag = "log",
    operation_id = "shareLog",
    summary = "Share log file",
    description = "Hands the durable session file to the configured share target.",
    responses(
        (status = 200, description = "File shared", body = ShareLogResponse),
        (status = 404, description = "Session file missing", body = ErrorResponse),
        (status = 500, description = "Share target failed", body = ErrorResponse)
    )
)]
pub async fn share_log(State(state): State<SharedState>) -> ApiResult<Json<ShareLogResponse>> {
    let log = state.log().clone();
    let sink = state.share_sink();
    // Reads the whole session file.
    let path = tokio::task::spawn_blocking(move || log.share(sink.as_ref()))
        .await
        .map_err(|e| ApiError::InternalError {
            error_code: "share_task_failed".to_string(),
            message: "Share task did not complete".to_string(),
            details: Some(e.to_string()),
        })??;
    Ok(Json(ShareLogResponse {
        file_path: path.display().to_string(),
    }))
}
