//! Shared data model and OpenAPI schemas.
//!
//! These types cross module boundaries: a [`LocationFix`] comes out of the
//! location source, a [`ComplianceResult`] comes back from the compliance
//! service, and both end up in the session snapshot served by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single position sample reported by a location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "latitude": 25.123456,
    "longitude": -80.123456,
    "accuracy_m": 5.0,
    "captured_at_utc": "2025-07-01T09:30:00Z"
}))]
pub struct LocationFix {
    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,

    /// Horizontal accuracy radius in meters.
    pub accuracy_m: f64,

    /// When the fix was captured.
    pub captured_at_utc: DateTime<Utc>,
}

impl LocationFix {
    /// Creates a fix captured now.
    #[must_use]
    pub fn now(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
            captured_at_utc: Utc::now(),
        }
    }

    /// One-line summary used in the session log and status line.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "GPS: Lat {:.6}, Lon {:.6}, Acc {:.1}m",
            self.latitude, self.longitude, self.accuracy_m
        )
    }
}

/// Coordinates echoed back by the compliance service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    /// Latitude in decimal degrees.
    pub latitude: f64,

    /// Longitude in decimal degrees.
    pub longitude: f64,
}

/// The compliance service's determination for one coordinate.
///
/// Field names on the wire follow the service (`in_no_swim_zone`,
/// `zone_details`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "in_no_swim_zone": true,
    "compliance_status": "VIOLATION",
    "coordinates": { "latitude": 25.123456, "longitude": -80.123456 },
    "zone_details": { "nameEn": "Example Outfall", "code": "Z-1" }
}))]
pub struct ComplianceResult {
    /// Whether the coordinate lies inside a restricted zone.
    #[serde(rename = "in_no_swim_zone")]
    pub in_restricted_zone: bool,

    /// Free-form status reported by the service.
    #[serde(default)]
    pub compliance_status: String,

    /// Coordinates the service actually evaluated.
    #[serde(default, rename = "coordinates")]
    pub confirmed_coordinates: Option<Coordinates>,

    /// Facility metadata, when the service has any.
    #[serde(default)]
    pub zone_details: Option<ZoneDetails>,
}

impl ComplianceResult {
    /// Facility name for display, `"Unknown"` when no details were sent.
    #[must_use]
    pub fn facility_name(&self) -> &str {
        self.zone_details
            .as_ref()
            .and_then(|d| d.name_en.as_deref())
            .unwrap_or("Unknown")
    }
}

/// Descriptive record of the facility behind a restricted zone.
///
/// Every field is optional; the service omits whatever it does not know and
/// nothing in the alerting logic depends on these values. Field names mirror
/// the service's camelCase keys.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoneDetails {
    pub code: Option<String>,
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub municipal: Option<String>,
    pub municipal_en: Option<String>,
    pub administrative_region: Option<String>,
    pub administrative_region_en: Option<String>,
    pub receiver_name: Option<String>,
    pub receiver_name_en: Option<String>,
    pub receiver_code: Option<String>,
    pub receiver_sensitive: Option<bool>,
    pub receiver_water_type: Option<i32>,
    /// Treatment capacity in m³/day.
    pub capacity: Option<f64>,
    pub year: Option<i32>,
    pub compliance: Option<bool>,
    pub priority: Option<String>,
    pub priority_en: Option<String>,
    pub priority_id: Option<bool>,
    pub river_basin: Option<String>,
    pub river_basin_en: Option<String>,
    pub river_basin_district: Option<String>,
    pub river_basin_district_en: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub waste_treatment_method: Option<String>,
    pub sludge_treatment_method: Option<String>,
    pub reuse: Option<bool>,
}

impl ZoneDetails {
    /// Renders the detail block written to the session log.
    #[must_use]
    pub fn log_lines(&self) -> Vec<String> {
        fn text(value: Option<&String>) -> &str {
            value.map_or("-", String::as_str)
        }
        fn flag(value: Option<bool>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }

        vec![
            format!(
                "Facility: {} ({})",
                text(self.name_en.as_ref()),
                text(self.name.as_ref())
            ),
            format!("Code: {}", text(self.code.as_ref())),
            format!("Municipality: {}", text(self.municipal_en.as_ref())),
            format!("Region: {}", text(self.administrative_region_en.as_ref())),
            format!("Receiver: {}", text(self.receiver_name_en.as_ref())),
            format!("Receiver Code: {}", text(self.receiver_code.as_ref())),
            format!(
                "Capacity: {} m³/day",
                self.capacity
                    .map_or_else(|| "-".to_string(), format_thousands)
            ),
            format!(
                "Year Established: {}",
                self.year.map_or_else(|| "-".to_string(), |y| y.to_string())
            ),
            format!("Facility Compliance: {}", flag(self.compliance)),
            format!("Priority: {}", text(self.priority_en.as_ref())),
            format!("River Basin: {}", text(self.river_basin_en.as_ref())),
            format!("District: {}", text(self.river_basin_district_en.as_ref())),
            format!(
                "Treatment Method: {}",
                text(self.waste_treatment_method.as_ref())
            ),
            format!("Sensitive Receiver: {}", flag(self.receiver_sensitive)),
        ]
    }
}

/// Formats a capacity rounded to whole units with `,` thousands separators.
#[allow(clippy::cast_possible_truncation)]
fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compliance_result_minimal_body() {
        let json = r#"{"in_no_swim_zone": false, "compliance_status": "OK"}"#;
        let result: ComplianceResult = serde_json::from_str(json).unwrap();
        assert!(!result.in_restricted_zone);
        assert_eq!(result.compliance_status, "OK");
        assert!(result.confirmed_coordinates.is_none());
        assert!(result.zone_details.is_none());
        assert_eq!(result.facility_name(), "Unknown");
    }

    #[test]
    fn test_compliance_result_with_partial_zone_details() {
        let json = r#"{
            "in_no_swim_zone": true,
            "compliance_status": "VIOLATION",
            "coordinates": {"latitude": 25.123456, "longitude": -80.123456},
            "zone_details": {"nameEn": "Example Outfall", "code": "Z-1"}
        }"#;
        let result: ComplianceResult = serde_json::from_str(json).unwrap();
        assert!(result.in_restricted_zone);
        assert_eq!(result.facility_name(), "Example Outfall");

        let details = result.zone_details.unwrap();
        assert_eq!(details.code.as_deref(), Some("Z-1"));
        assert!(details.capacity.is_none());
    }

    #[test]
    fn test_compliance_result_null_details() {
        let json = r#"{"in_no_swim_zone": false, "compliance_status": "OK",
                       "coordinates": null, "zone_details": null}"#;
        let result: ComplianceResult = serde_json::from_str(json).unwrap();
        assert!(result.zone_details.is_none());
    }

    #[test]
    fn test_compliance_result_requires_zone_flag() {
        let json = r#"{"compliance_status": "OK"}"#;
        assert!(serde_json::from_str::<ComplianceResult>(json).is_err());
    }

    #[test]
    fn test_zone_details_log_lines() {
        let details = ZoneDetails {
            name: Some("Εγκατάσταση".into()),
            name_en: Some("Example Outfall".into()),
            code: Some("Z-1".into()),
            capacity: Some(12_500.0),
            year: Some(1998),
            receiver_sensitive: Some(true),
            ..ZoneDetails::default()
        };
        let lines = details.log_lines();
        assert_eq!(lines[0], "Facility: Example Outfall (Εγκατάσταση)");
        assert!(lines.contains(&"Code: Z-1".to_string()));
        assert!(lines.contains(&"Capacity: 12,500 m³/day".to_string()));
        assert!(lines.contains(&"Year Established: 1998".to_string()));
        assert!(lines.contains(&"Sensitive Receiver: true".to_string()));
        assert!(lines.contains(&"Municipality: -".to_string()));
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1_234_567.4), "1,234,567");
        assert_eq!(format_thousands(-4200.0), "-4,200");
    }

    #[test]
    fn test_fix_summary() {
        let fix = LocationFix::now(25.123_456, -80.123_456, 5.0);
        assert_eq!(fix.summary(), "GPS: Lat 25.123456, Lon -80.123456, Acc 5.0m");
    }
}
