//! Format decoders
//!
//! Each decoder turns the raw bytes of one source into a complete feature
//! list, or fails with [`Error::MalformedSource`] when the document's overall
//! shape is wrong. Row- or entry-level problems with coordinates never fail a
//! decode; they produce non-renderable features instead.

mod live_api;
mod tabular;
mod vector;

pub use live_api::decode_live_api;
pub use tabular::decode_tabular;
pub use vector::decode_feature_collection;

use crate::{DecoderKind, Error, Feature, Result};

/// Decode a source's bytes with the decoder its kind names
pub fn decode(kind: &DecoderKind, bytes: &[u8]) -> Result<Vec<Feature>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("decode::decode", kind.name());

    match kind {
        DecoderKind::Vector => decode_feature_collection(bytes),
        DecoderKind::Tabular {
            longitude_column,
            latitude_column,
        } => decode_tabular(bytes, longitude_column, latitude_column),
        DecoderKind::LiveApi {
            list_field,
            longitude_field,
            latitude_field,
        } => decode_live_api(bytes, list_field, longitude_field, latitude_field),
        DecoderKind::Unsupported => Err(Error::MalformedSource(
            "no decoder for unsupported source kind".to_string(),
        )),
    }
}

/// Parse a JSON document, mapping syntax errors to `MalformedSource`
fn parse_json(bytes: &[u8]) -> Result<serde_json::Value> {
    serde_json::from_slice(bytes).map_err(|e| Error::MalformedSource(format!("invalid JSON: {e}")))
}
