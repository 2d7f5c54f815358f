//! API error types and response handling.
//!
//! Every handler returns [`ApiResult`]; failures become a JSON
//! [`ErrorResponse`] with a status code chosen from the core error taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use noswim_core::{NoSwimError, ShareError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details.
        details: Option<String>,
    },

    /// 502 Bad Gateway - An upstream service answered badly.
    BadGateway {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - Location or monitoring is not available.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "log_file_missing",
    "message": "Log file does not exist: /var/lib/noswim/logs/NoSwimLog_20250101_120000.txt",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code.
    #[schema(example = "log_file_missing")]
    pub error: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Status code this error maps to.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = match self {
            Self::NotFound { error_code, message }
            | Self::BadGateway { error_code, message }
            | Self::ServiceUnavailable { error_code, message } => ErrorResponse {
                error: error_code,
                message,
                details: None,
            },

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                ErrorResponse {
                    error: error_code,
                    message,
                    details: details.map(serde_json::Value::String),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
            Self::BadGateway { message, .. } => write!(f, "Bad Gateway: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<NoSwimError> for ApiError {
    fn from(err: NoSwimError) -> Self {
        let error_code = err.error_code().to_ascii_lowercase();
        let message = err.to_string();

        match err.http_status_code() {
            404 => Self::NotFound { error_code, message },
            502 => Self::BadGateway { error_code, message },
            503 => Self::ServiceUnavailable { error_code, message },
            _ => Self::InternalError {
                error_code,
                message,
                details: None,
            },
        }
    }
}

impl From<ShareError> for ApiError {
    fn from(err: ShareError) -> Self {
        Self::from(NoSwimError::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_not_found_display() {
        let err = ApiError::NotFound {
            error_code: "map_unavailable".to_string(),
            message: "No map image yet".to_string(),
        };
        assert!(err.to_string().contains("Not Found"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "test_error".to_string(),
            message: "Test message".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("test_error"));
    }

    #[test]
    fn test_core_errors_map_to_status() {
        let missing = ApiError::from(ShareError::Missing(PathBuf::from("/tmp/gone.txt")));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert!(matches!(
            missing,
            ApiError::NotFound { ref error_code, .. } if error_code == "log_file_missing"
        ));

        let upstream = ApiError::from(NoSwimError::ResponseParse("bad json".into()));
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let location = ApiError::from(NoSwimError::LocationDisabled);
        assert_eq!(location.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let shared = ApiError::from(NoSwimError::ShareFailed("no target".into()));
        assert_eq!(shared.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
