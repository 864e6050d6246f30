//! Value classifier for measured-quantity (air quality) payloads
//!
//! Stations report one record per quantity inside a nested payload, e.g.
//!
//! ```json
//! "AQILast": {
//!     "PM25": {"color_id": "2", "aqi": "35", "value": "20.1"},
//!     "AQI":  {"color_id": "2", "aqi": "35", "param": "PM25"}
//! }
//! ```
//!
//! The severity comes from the vendor's bucket code (`color_id`); thresholds
//! are never recomputed here.

use crate::{Color, Error, Feature, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Reading meaning "instrument offline"
const SENTINEL_OFFLINE: f64 = -999.0;

/// Reading meaning "reading unavailable"
const SENTINEL_UNAVAILABLE: f64 = -1.0;

/// Color of readings whose bucket code is not recognized
pub const NEUTRAL_COLOR: Color = Color::rgb(0x9E, 0x9E, 0x9E);

/// Measured quantities a station may report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quantity {
    #[default]
    #[serde(rename = "AQI")]
    Aqi,
    #[serde(rename = "PM25")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "O3")]
    O3,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "SO2")]
    So2,
}

impl Quantity {
    pub const ALL: [Quantity; 7] = [
        Self::Aqi,
        Self::Pm25,
        Self::Pm10,
        Self::O3,
        Self::Co,
        Self::No2,
        Self::So2,
    ];

    /// Key of this quantity's record in the station payload
    pub fn key(&self) -> &'static str {
        match self {
            Self::Aqi => "AQI",
            Self::Pm25 => "PM25",
            Self::Pm10 => "PM10",
            Self::O3 => "O3",
            Self::Co => "CO",
            Self::No2 => "NO2",
            Self::So2 => "SO2",
        }
    }

    /// Field holding the displayed reading: the index itself for AQI, the
    /// concentration for pollutants
    fn reading_field(&self) -> &'static str {
        match self {
            Self::Aqi => "aqi",
            _ => "value",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Quantity {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|quantity| quantity.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidSelection(format!("unknown quantity `{s}`")))
    }
}

/// Severity bucket of a reading, in increasing order of concern
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeverityClass {
    VeryGood,
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    /// The vendor code was not recognized
    Unknown,
}

impl SeverityClass {
    /// Total lookup from the vendor bucket code
    pub fn from_bucket_code(code: &str) -> Self {
        match code.trim() {
            "1" => Self::VeryGood,
            "2" => Self::Good,
            "3" => Self::Moderate,
            "4" => Self::UnhealthyForSensitiveGroups,
            "5" => Self::Unhealthy,
            _ => Self::Unknown,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::VeryGood => Color::rgb(0x3B, 0xCC, 0xFF),
            Self::Good => Color::rgb(0x92, 0xD0, 0x50),
            Self::Moderate => Color::rgb(0xFF, 0xFF, 0x00),
            Self::UnhealthyForSensitiveGroups => Color::rgb(0xFF, 0xA2, 0x00),
            Self::Unhealthy => Color::rgb(0xF0, 0x46, 0x46),
            Self::Unknown => NEUTRAL_COLOR,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryGood => "Very good",
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for sensitive groups",
            Self::Unhealthy => "Unhealthy",
            Self::Unknown => "Unknown",
        }
    }
}

/// Reading shown next to a station
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DisplayValue {
    Numeric(f64),
    Categorical(String),
}

impl DisplayValue {
    fn from_json(value: &Value) -> Option<Self> {
        let display = match value {
            Value::Number(number) => Self::Numeric(number.as_f64()?),
            Value::String(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return None;
                }
                match text.parse::<f64>() {
                    Ok(number) if number.is_finite() => Self::Numeric(number),
                    _ => Self::Categorical(text.to_string()),
                }
            }
            _ => return None,
        };

        match display {
            Self::Numeric(number)
                if number == SENTINEL_UNAVAILABLE || number == SENTINEL_OFFLINE =>
            {
                None
            }
            display => Some(display),
        }
    }
}

impl fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(number) if number.fract() == 0.0 && number.abs() < 1e15 => {
                write!(f, "{}", *number as i64)
            }
            Self::Numeric(number) => write!(f, "{number}"),
            Self::Categorical(text) => f.write_str(text),
        }
    }
}

/// Classification of one feature for one quantity
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub severity: SeverityClass,
    pub color: Color,
    pub label: &'static str,
    pub value: DisplayValue,
    /// The vendor bucket code as reported
    pub bucket_code: String,
}

/// Classify a feature for the given quantity
///
/// Returns `None` when the feature has no usable reading: missing or
/// malformed payload, no record for the quantity, or a sentinel reading.
#[inline]
pub fn classify(
    feature: &Feature,
    quantity: Quantity,
    payload_property: &str,
) -> Option<ClassificationResult> {
    try_classify(feature, quantity, payload_property).ok()
}

/// Like [`classify`], reporting [`Error::UnclassifiableFeature`] instead of `None`
pub fn try_classify(
    feature: &Feature,
    quantity: Quantity,
    payload_property: &str,
) -> Result<ClassificationResult> {
    let unclassifiable = || Error::UnclassifiableFeature { quantity };

    let payload = payload(feature, payload_property).ok_or_else(unclassifiable)?;
    let record = payload
        .get(quantity.key())
        .and_then(Value::as_object)
        .ok_or_else(unclassifiable)?;

    let reading = match record.get(quantity.reading_field()) {
        Some(value) if !value.is_null() => value,
        _ => record.get("aqi").ok_or_else(unclassifiable)?,
    };
    let value = DisplayValue::from_json(reading).ok_or_else(unclassifiable)?;

    let bucket_code = match record.get("color_id") {
        Some(Value::String(code)) => code.trim().to_string(),
        Some(Value::Number(code)) => bucket_code_from_number(code),
        _ => String::new(),
    };
    let severity = SeverityClass::from_bucket_code(&bucket_code);

    Ok(ClassificationResult {
        severity,
        color: severity.color(),
        label: severity.label(),
        value,
        bucket_code,
    })
}

/// Integral codes print without a fraction, so `2.0` reads as bucket `2`
fn bucket_code_from_number(code: &Number) -> String {
    match (code.as_u64(), code.as_f64()) {
        (Some(integer), _) => integer.to_string(),
        (None, Some(float)) if float.fract() == 0.0 && (0.0..=u64::MAX as f64).contains(&float) => {
            (float as u64).to_string()
        }
        _ => code.to_string(),
    }
}

/// The per-station payload, parsing it first when it arrives JSON-encoded
fn payload<'a>(feature: &'a Feature, property: &str) -> Option<Cow<'a, Map<String, Value>>> {
    match feature.property(property)? {
        Value::Object(map) => Some(Cow::Borrowed(map)),
        Value::String(encoded) => match serde_json::from_str(encoded).ok()? {
            Value::Object(map) => Some(Cow::Owned(map)),
            _ => None,
        },
        _ => None,
    }
}
