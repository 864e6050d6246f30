//! Citymap Library - Layer ingestion and style selection for city maps
//!
//! This library turns a catalog of heterogeneous geospatial sources (GeoJSON
//! files, CSV point tables and polling JSON APIs) into normalized layers, and
//! decides at render time which of those layers are drawn and how.
//!
//! # Architecture
//!
//! - **[`SourceRegistry`]**: Ordered, immutable catalog of [`SourceDescriptor`]s
//! - **[`decode`]**: Format decoders producing [`Feature`] lists
//! - **[`Ingestor`]**: Bounded concurrent fetch + decode, one [`Layer`] per source
//! - **[`LivePoller`]**: Periodic re-ingestion of live sources without stale overwrites
//! - **[`classify`]**: Bucket-code classification of air quality readings
//! - **[`resolve`]**: Style precedence (classified > icon > extrusion > line)
//! - **[`SelectionState`]**: Visibility overrides, basemap and active quantity
//!
//! # Failure Model
//!
//! Fetch and decode failures never propagate out of an ingestion batch: the
//! affected source becomes an empty, degraded [`Layer`] and every other source
//! is unaffected.

pub mod catalog;
mod classify;
mod color;
pub mod decode;
mod feature;
mod fetch;
mod ingest;
mod layer;
mod poll;
mod selection;
mod source;
mod style;
pub mod utils;

// Public API exports
pub use catalog::Basemap;
pub use classify::{
    ClassificationResult, DisplayValue, Quantity, SeverityClass, classify, try_classify,
};
pub use color::Color;
pub use feature::{Feature, Geometry, GeometryKind, Properties};
pub use fetch::{DirectoryFetcher, Fetcher, HttpFetcher, MemoryFetcher};
pub use ingest::{IngestConfig, Ingestor};
pub use layer::{Layer, LayerHealth, LayerIndicator, LayerListEntry, LayerStore, layer_list};
pub use poll::{LivePoller, PollOutcome};
pub use selection::{SelectionState, SharedSelection};
pub use source::{
    ClassificationSpec, DecoderKind, ExtrusionSpec, SourceDescriptor, SourceRegistry, ZoomRange,
};
pub use style::{
    LayerStyle, LineStyle, Primitive, PrimitiveKind, StyleDescriptor, StyleRule, line_style,
    resolve, resolve_all,
};

/// Error types for the layer pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Fetch failed for {location}: {reason}")]
    FetchFailure { location: String, reason: String },

    #[error("Malformed source: {0}")]
    MalformedSource(String),

    #[error("Layer `{id}` is degraded: {cause}")]
    DegradedLayer { id: String, cause: Box<Error> },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("No usable {quantity} reading")]
    UnclassifiableFeature { quantity: Quantity },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the main entry points are accessible
        let _: fn() -> SourceRegistry = catalog::bangkok;
        let _: fn() -> IngestConfig = IngestConfig::default;
        let _: fn(&Layer, f64, &SelectionState) -> Vec<StyleDescriptor> = resolve;
    }

    #[test]
    fn test_degraded_layer_message_includes_cause() {
        let error = Error::DegradedLayer {
            id: "road".to_string(),
            cause: Box::new(Error::MalformedSource("not a feature collection".into())),
        };
        assert_eq!(
            error.to_string(),
            "Layer `road` is degraded: Malformed source: not a feature collection"
        );
    }
}
