//! Native-to-metric conversion and locale-invariant value formatting.

/// Marker for a field whose value is unavailable or not applicable.
pub const SENTINEL: &str = "None";

pub const FEET_TO_METERS: f64 = 0.3048;
pub const SQ_FEET_TO_SQ_METERS: f64 = 0.092903;
pub const CU_FEET_TO_CU_METERS: f64 = 0.0283168;

/// Shortest round-trip decimal form, `.` as separator regardless of locale.
///
/// Non-finite values have no meaningful measurement and map to [`SENTINEL`].
pub fn format_number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        SENTINEL.to_string()
    }
}

pub fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| SENTINEL.to_string(), format_number)
}

/// Blank or missing text becomes [`SENTINEL`].
pub fn format_text(value: Option<&str>) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => SENTINEL.to_string(),
    }
}
