//! OpenAPI specification for the noswim status API.

use axum::Json;
use utoipa::OpenApi;

use noswim_core::{
    AlertState, ComplianceResult, Coordinates, LocationFix, Overlay, SessionPhase,
    SessionSnapshot, StatusKind, StatusLine, ZoneDetails,
};

use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::log::{LogResponse, ShareLogResponse};
use super::status::StatusResponse;
use crate::presenter::{MapState, PresentationState};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Pretty-printed specification, for writing to a file.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// OpenAPI document for the noswim status API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "noswim API",
        version = "0.1.0",
        description = r#"
# noswim API

noswim watches your position and warns you when you are in a bathing area
where swimming is not allowed because of a nearby wastewater outfall.

## Overview

A background monitor takes a position fix every few seconds and asks a
compliance service whether it falls inside a restricted zone. This API exposes:

1. **Status**: alert state, last fix, last compliance result, alarm/flash/overlay
2. **Map**: the last static map snapshot around the fix
3. **Log**: the session log view, clearing it, and exporting the durable file

## Alert states

- `UNINITIALIZED`: no determination yet
- `SAFE`: the last determination was outside every restricted zone
- `UNSAFE`: the last determination was inside a restricted zone; the alarm plays
- `DEGRADED`: the last cycle could not determine the zone state
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local noswim server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "monitoring", description = "Zone compliance status and map snapshot"),
        (name = "log", description = "Session log view and export")
    ),
    paths(
        super::health::health_check,
        super::status::get_status,
        super::status::get_map,
        super::log::get_log,
        super::log::clear_log,
        super::log::share_log,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            StatusResponse,
            PresentationState,
            MapState,
            LogResponse,
            ShareLogResponse,
            SessionSnapshot,
            SessionPhase,
            AlertState,
            Overlay,
            StatusLine,
            StatusKind,
            LocationFix,
            ComplianceResult,
            Coordinates,
            ZoneDetails,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "noswim API");
        assert!(spec.paths.paths.contains_key("/api/status"));
        assert!(spec.paths.paths.contains_key("/api/log/share"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"noswim API\""));
        assert!(json.contains("ZoneDetails"));
    }
}
