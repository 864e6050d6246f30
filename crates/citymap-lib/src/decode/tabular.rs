//! Tabular (CSV) point decoder
//!
//! The first row is the header. Every following row becomes one point
//! feature whose properties are the row's cells keyed by header name, in
//! header order. Cells are read as bytes and decoded lossily, so a row in a
//! legacy encoding keeps its coordinates and never fails the whole source.

use crate::{Error, Feature, Properties, Result, utils};
use serde_json::Value;
use std::borrow::Cow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode header-delimited text into point features
///
/// The longitude/latitude columns must exist in the header. A row whose
/// coordinate cells are missing or non-numeric still produces a feature, with
/// invalid (non-renderable) coordinates. Row order is preserved.
pub fn decode_tabular(
    bytes: &[u8],
    longitude_column: &str,
    latitude_column: &str,
) -> Result<Vec<Feature>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| Error::MalformedSource(format!("unreadable header: {e}")))?
        .clone();

    let column = |name: &str| {
        headers.iter().position(|header| header == name).ok_or_else(|| {
            Error::MalformedSource(format!("header has no `{name}` column"))
        })
    };
    let longitude_index = column(longitude_column)?;
    let latitude_index = column(latitude_column)?;

    let mut features = Vec::new();
    for (row, record) in reader.byte_records().enumerate() {
        let record =
            record.map_err(|e| Error::MalformedSource(format!("row {}: {e}", row + 1)))?;
        let cells: Vec<Cow<'_, str>> = record.iter().map(String::from_utf8_lossy).collect();

        let properties: Properties = headers
            .iter()
            .zip(&cells)
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect();

        let longitude = cells
            .get(longitude_index)
            .and_then(|cell| utils::parse_number_str(cell));
        let latitude = cells
            .get(latitude_index)
            .and_then(|cell| utils::parse_number_str(cell));

        features.push(Feature::new(
            utils::point_geometry(longitude, latitude),
            properties,
        ));
    }

    tracing::trace!(rows = features.len(), "Decoded tabular source");
    Ok(features)
}
