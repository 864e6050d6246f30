//! GeoJSON feature collection decoder
//!
//! Identity transform plus validation: point geometries become point
//! features, every other recognized geometry is passed through untouched.

use super::parse_json;
use crate::{Error, Feature, Geometry, GeometryKind, Properties, Result, utils};
use serde_json::Value;

/// Decode a GeoJSON `FeatureCollection`
pub fn decode_feature_collection(bytes: &[u8]) -> Result<Vec<Feature>> {
    let Value::Object(mut document) = parse_json(bytes)? else {
        return Err(Error::MalformedSource(
            "top-level value is not an object".to_string(),
        ));
    };

    if document.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(Error::MalformedSource(
            "top-level object is not a FeatureCollection".to_string(),
        ));
    }

    let Some(Value::Array(entries)) = document.remove("features") else {
        return Err(Error::MalformedSource(
            "FeatureCollection has no `features` array".to_string(),
        ));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| decode_feature(index, entry))
        .collect()
}

fn decode_feature(index: usize, entry: Value) -> Result<Feature> {
    let malformed = |what: &str| Error::MalformedSource(format!("feature {index}: {what}"));

    let Value::Object(mut object) = entry else {
        return Err(malformed("not an object"));
    };
    if object.get("type").and_then(Value::as_str) != Some("Feature") {
        return Err(malformed("type is not `Feature`"));
    }

    let raw_geometry = match object.remove("geometry") {
        Some(Value::Null) | None => return Err(malformed("missing geometry")),
        Some(geometry) => geometry,
    };
    let type_name = raw_geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("geometry has no type"))?;
    let kind = GeometryKind::from_type_name(type_name)
        .ok_or_else(|| malformed(&format!("unrecognized geometry type `{type_name}`")))?;

    let geometry = match kind {
        GeometryKind::Point => point_geometry(&raw_geometry),
        _ => Geometry::Opaque {
            kind,
            raw: raw_geometry,
        },
    };

    let properties = match object.remove("properties") {
        Some(Value::Object(properties)) => properties,
        Some(Value::Null) | None => Properties::new(),
        Some(_) => return Err(malformed("properties is not an object")),
    };

    Ok(Feature::new(geometry, properties))
}

/// `{"type": "Point", "coordinates": [lon, lat]}` to a point geometry
fn point_geometry(raw: &Value) -> Geometry {
    let coordinates = raw.get("coordinates").and_then(Value::as_array);
    let axis = |i: usize| {
        coordinates
            .and_then(|coordinates| coordinates.get(i))
            .and_then(utils::parse_number)
    };
    utils::point_geometry(axis(0), axis(1))
}
