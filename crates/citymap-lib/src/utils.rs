//! Utility functions for number parsing and coordinate validation

use crate::Geometry;
use geo::Point;
use serde_json::Value;

/// Longitude bounds in degrees (WGS84)
pub const MAX_LONGITUDE: f64 = 180.0;

/// Latitude bounds in degrees (WGS84)
pub const MAX_LATITUDE: f64 = 90.0;

/// Parse a number from text using standard floating-point rules
///
/// Surrounding whitespace is ignored. Non-finite values (`NaN`, `inf`) are
/// rejected since they can never be drawn.
#[inline]
pub fn parse_number_str(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse a number from a JSON value, accepting numbers and numeric strings
///
/// Upstream APIs are inconsistent here: Air4Thai, for instance, reports
/// `"Lat": "13.7563"` as a string.
#[inline]
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|value| value.is_finite()),
        Value::String(text) => parse_number_str(text),
        _ => None,
    }
}

/// Check if a longitude/latitude pair lies within WGS84 bounds
#[inline(always)]
pub fn is_valid_wgs84(lon: f64, lat: f64) -> bool {
    (-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lon) && (-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat)
}

/// Build a point geometry, or an invalid point when either coordinate is unusable
pub fn point_geometry(lon: Option<f64>, lat: Option<f64>) -> Geometry {
    match (lon, lat) {
        (Some(lon), Some(lat)) if is_valid_wgs84(lon, lat) => Geometry::Point(Point::new(lon, lat)),
        _ => Geometry::InvalidPoint,
    }
}

/// Icon identifier for an icon reference: the file name without its extension
///
/// `"school.png"` and `"images/school.png"` both map to `"school"`.
pub fn icon_id(reference: &str) -> &str {
    let file_name = reference.rsplit('/').next().unwrap_or(reference);
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number_str() {
        assert_eq!(parse_number_str("100.5"), Some(100.5));
        assert_eq!(parse_number_str(" 13.7 "), Some(13.7));
        assert_eq!(parse_number_str("-0.1278"), Some(-0.1278));
        assert_eq!(parse_number_str("bad"), None);
        assert_eq!(parse_number_str(""), None);
        assert_eq!(parse_number_str("NaN"), None);
        assert_eq!(parse_number_str("inf"), None);
    }

    #[test]
    fn test_parse_number_json() {
        assert_eq!(parse_number(&json!(100.5)), Some(100.5));
        assert_eq!(parse_number(&json!(13)), Some(13.0));
        assert_eq!(parse_number(&json!("13.75")), Some(13.75));
        assert_eq!(parse_number(&json!(null)), None);
        assert_eq!(parse_number(&json!([1.0])), None);
    }

    #[test]
    fn test_is_valid_wgs84() {
        assert!(is_valid_wgs84(0.0, 0.0));
        assert!(is_valid_wgs84(180.0, -90.0));
        assert!(!is_valid_wgs84(180.1, 0.0));
        assert!(!is_valid_wgs84(0.0, 91.0));
    }

    #[test]
    fn test_point_geometry() {
        assert_eq!(
            point_geometry(Some(100.5), Some(13.7)),
            Geometry::Point(Point::new(100.5, 13.7))
        );
        assert_eq!(point_geometry(None, Some(13.7)), Geometry::InvalidPoint);
        assert_eq!(point_geometry(Some(500.0), Some(13.7)), Geometry::InvalidPoint);
    }

    #[test]
    fn test_icon_id() {
        assert_eq!(icon_id("school.png"), "school");
        assert_eq!(icon_id("images/cctv.png"), "cctv");
        assert_eq!(icon_id("air"), "air");
        assert_eq!(icon_id(".hidden"), ".hidden");
    }
}
