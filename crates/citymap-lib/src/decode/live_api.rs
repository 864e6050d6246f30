//! Live API (station list) decoder

use super::parse_json;
use crate::{Error, Feature, Result, utils};
use serde_json::Value;

/// Decode a JSON document holding a list of stations into point features
///
/// A missing (or `null`) list field means the API currently reports no
/// stations and yields an empty list. Coordinate field names are passed in
/// because upstream APIs disagree on casing (`Lat`/`lat`/`latitude`).
pub fn decode_live_api(
    bytes: &[u8],
    list_field: &str,
    longitude_field: &str,
    latitude_field: &str,
) -> Result<Vec<Feature>> {
    let Value::Object(mut document) = parse_json(bytes)? else {
        return Err(Error::MalformedSource(
            "top-level value is not an object".to_string(),
        ));
    };

    let entries = match document.remove(list_field) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(Error::MalformedSource(format!(
                "`{list_field}` is not an array"
            )));
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let Value::Object(properties) = entry else {
                return Err(Error::MalformedSource(format!(
                    "`{list_field}` entry {index} is not an object"
                )));
            };
            let longitude = properties
                .get(longitude_field)
                .and_then(utils::parse_number);
            let latitude = properties
                .get(latitude_field)
                .and_then(utils::parse_number);
            Ok(Feature::new(
                utils::point_geometry(longitude, latitude),
                properties,
            ))
        })
        .collect()
}
