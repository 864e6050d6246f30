//! Layers and the layer store
//!
//! A [`Layer`] is the decoded feature set of one source. Layers are built
//! whole by the ingestor and replaced whole on re-ingestion; there is no
//! incremental feature update.

use crate::{Error, Feature, SelectionState, SourceDescriptor};
use geo::{BoundingRect, MultiPoint, Rect};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Outcome of the ingestion that produced a layer
#[derive(Clone, Debug, PartialEq)]
pub enum LayerHealth {
    /// Fetched and decoded completely
    Healthy,
    /// Fetch or decode failed; the layer is empty
    Degraded(Error),
    /// The source kind is not supported and was never fetched
    Skipped,
}

/// A source's normalized features plus visibility and health
#[derive(Clone, Debug)]
pub struct Layer {
    source: Arc<SourceDescriptor>,
    features: Vec<Feature>,
    visible: bool,
    health: LayerHealth,
    loaded_at: Instant,
}

impl Layer {
    fn build(source: Arc<SourceDescriptor>, features: Vec<Feature>, health: LayerHealth) -> Self {
        let visible = source.visible;
        Self {
            source,
            features,
            visible,
            health,
            loaded_at: Instant::now(),
        }
    }

    /// A layer holding a complete decoded feature list
    pub fn healthy(source: Arc<SourceDescriptor>, features: Vec<Feature>) -> Self {
        Self::build(source, features, LayerHealth::Healthy)
    }

    /// An empty layer recording why ingestion failed
    pub fn degraded(source: Arc<SourceDescriptor>, cause: Error) -> Self {
        Self::build(source, Vec::new(), LayerHealth::Degraded(cause))
    }

    /// An empty layer for a source that is not ingested
    pub fn skipped(source: Arc<SourceDescriptor>) -> Self {
        Self::build(source, Vec::new(), LayerHealth::Skipped)
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.source.id
    }

    #[inline]
    pub fn source(&self) -> &Arc<SourceDescriptor> {
        &self.source
    }

    #[inline]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    #[inline]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Number of features the renderer can draw
    pub fn renderable_count(&self) -> usize {
        self.features.iter().filter(|f| f.is_renderable()).count()
    }

    /// The layer's own visibility flag (initialised from the source default)
    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[inline]
    pub fn health(&self) -> &LayerHealth {
        &self.health
    }

    #[inline]
    pub fn is_degraded(&self) -> bool {
        matches!(self.health, LayerHealth::Degraded(_))
    }

    /// A `DegradedLayer` error wrapping the ingestion failure, if any
    pub fn error(&self) -> Option<Error> {
        match &self.health {
            LayerHealth::Degraded(cause) => Some(Error::DegradedLayer {
                id: self.source.id.clone(),
                cause: Box::new(cause.clone()),
            }),
            _ => None,
        }
    }

    /// When this layer was ingested
    #[inline]
    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    /// Bounding box (longitude/latitude) of the layer's point features
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        let points: MultiPoint<f64> = self
            .features
            .iter()
            .filter_map(Feature::position)
            .collect();
        points.bounding_rect()
    }
}

impl AsRef<Layer> for Layer {
    fn as_ref(&self) -> &Layer {
        self
    }
}

/// The current layers, in registry order
///
/// Single writer, many readers: render passes take a [`snapshot`](Self::snapshot)
/// and never observe a half-applied re-ingestion.
#[derive(Debug, Default)]
pub struct LayerStore {
    layers: RwLock<Vec<Arc<Layer>>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl LayerStore {
    pub fn new(layers: Vec<Layer>) -> Self {
        Self {
            layers: RwLock::new(layers.into_iter().map(Arc::new).collect()),
        }
    }

    /// A consistent view of every layer
    pub fn snapshot(&self) -> Vec<Arc<Layer>> {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Layer>> {
        self.layers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|layer| layer.id() == id)
            .cloned()
    }

    /// Swap in a new layer for its source, leaving every other layer untouched
    ///
    /// Returns the replaced layer. A layer for an unknown source is appended.
    pub fn replace(&self, layer: Layer) -> Option<Arc<Layer>> {
        let mut layers = self.layers.write().unwrap_or_else(PoisonError::into_inner);
        let layer = Arc::new(layer);
        match layers.iter_mut().find(|current| current.id() == layer.id()) {
            Some(slot) => Some(std::mem::replace(slot, layer)),
            None => {
                layers.push(layer);
                None
            }
        }
    }

    /// Replace every layer at once (a full re-ingestion)
    pub fn replace_all(&self, layers: Vec<Layer>) {
        let layers = layers.into_iter().map(Arc::new).collect();
        *self.layers.write().unwrap_or_else(PoisonError::into_inner) = layers;
    }

    pub fn len(&self) -> usize {
        self.layers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a layer should appear in a layer list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerIndicator {
    /// Visible and healthy
    Shown,
    /// Intentionally hidden
    Hidden,
    /// Visible, but ingestion failed so there is nothing to draw
    Degraded,
    /// The source type cannot be ingested
    Unsupported,
}

/// One row of a layer list
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerListEntry {
    pub id: String,
    pub name: String,
    pub feature_count: usize,
    pub indicator: LayerIndicator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build the layer list a layer control displays
pub fn layer_list<L: AsRef<Layer>>(layers: &[L], selection: &SelectionState) -> Vec<LayerListEntry> {
    layers
        .iter()
        .map(AsRef::as_ref)
        .map(|layer| {
            let indicator = if !selection.layer_visible(layer) {
                LayerIndicator::Hidden
            } else {
                match layer.health() {
                    LayerHealth::Healthy => LayerIndicator::Shown,
                    LayerHealth::Degraded(_) => LayerIndicator::Degraded,
                    LayerHealth::Skipped => LayerIndicator::Unsupported,
                }
            };
            let error = match layer.health() {
                LayerHealth::Degraded(cause) => Some(cause.to_string()),
                _ => None,
            };
            LayerListEntry {
                id: layer.id().to_string(),
                name: layer.source().name.clone(),
                feature_count: layer.feature_count(),
                indicator,
                error,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecoderKind, Geometry, Properties, catalog};

    fn source(id: &str) -> Arc<SourceDescriptor> {
        Arc::new(SourceDescriptor::new(id, DecoderKind::Vector, format!("{id}.geojson"), id))
    }

    fn point(lon: f64, lat: f64) -> Feature {
        Feature::new(Geometry::Point(geo::Point::new(lon, lat)), Properties::new())
    }

    #[test]
    fn test_healthy_layer() {
        let layer = Layer::healthy(
            source("a"),
            vec![point(100.5, 13.7), Feature::new(Geometry::InvalidPoint, Properties::new())],
        );
        assert_eq!(layer.id(), "a");
        assert_eq!(layer.feature_count(), 2);
        assert_eq!(layer.renderable_count(), 1);
        assert!(layer.visible());
        assert!(!layer.is_degraded());
        assert!(layer.error().is_none());
    }

    #[test]
    fn test_degraded_layer_is_empty_and_reports_error() {
        let cause = Error::MalformedSource("bad".into());
        let layer = Layer::degraded(source("a"), cause.clone());
        assert!(layer.is_degraded());
        assert_eq!(layer.feature_count(), 0);
        assert_eq!(
            layer.error(),
            Some(Error::DegradedLayer {
                id: "a".into(),
                cause: Box::new(cause)
            })
        );
    }

    #[test]
    fn test_visibility_starts_from_source_default() {
        let hidden = Arc::new(
            SourceDescriptor::new("h", DecoderKind::Unsupported, "", "hidden").hidden(),
        );
        let mut layer = Layer::skipped(hidden);
        assert!(!layer.visible());
        assert!(!layer.is_degraded());
        layer.set_visible(true);
        assert!(layer.visible());
    }

    #[test]
    fn test_bounding_box() {
        let layer = Layer::healthy(source("a"), vec![point(100.0, 13.0), point(101.0, 14.5)]);
        let bbox = layer.bounding_box().unwrap();
        assert_eq!(bbox.min().x, 100.0);
        assert_eq!(bbox.max().y, 14.5);

        assert!(Layer::healthy(source("b"), vec![]).bounding_box().is_none());
    }

    #[test]
    fn test_store_replace_is_per_source() {
        let store = LayerStore::new(vec![
            Layer::healthy(source("a"), vec![point(1.0, 1.0)]),
            Layer::healthy(source("b"), vec![]),
        ]);
        let before = store.snapshot();

        let previous = store.replace(Layer::healthy(source("b"), vec![point(2.0, 2.0)]));
        assert_eq!(previous.unwrap().feature_count(), 0);

        let after = store.snapshot();
        assert_eq!(after.len(), 2);
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert_eq!(after[1].feature_count(), 1);
        // The earlier snapshot is unaffected
        assert_eq!(before[1].feature_count(), 0);
    }

    #[test]
    fn test_store_replace_unknown_appends() {
        let store = LayerStore::default();
        assert!(store.is_empty());
        assert!(store.replace(Layer::healthy(source("x"), vec![])).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.get("x").is_some());
    }

    #[test]
    fn test_layer_list_indicators() {
        let registry = catalog::bangkok();
        let mut selection = SelectionState::for_registry(&registry, catalog::basemaps()).unwrap();
        selection.set_layer_visible("road", false).unwrap();

        let layers = vec![
            Layer::healthy(registry.get("district").unwrap().clone(), vec![point(1.0, 1.0)]),
            Layer::healthy(registry.get("road").unwrap().clone(), vec![]),
            Layer::degraded(
                registry.get("bike_way").unwrap().clone(),
                Error::FetchFailure {
                    location: "bike_way.geojson".into(),
                    reason: "HTTP 404".into(),
                },
            ),
            Layer::skipped(registry.get("bma_basemap_arcgis").unwrap().clone()),
        ];

        let list = layer_list(&layers, &selection);
        assert_eq!(list[0].indicator, LayerIndicator::Shown);
        assert_eq!(list[0].feature_count, 1);
        assert_eq!(list[1].indicator, LayerIndicator::Hidden);
        assert_eq!(list[2].indicator, LayerIndicator::Degraded);
        assert!(list[2].error.as_deref().unwrap().contains("HTTP 404"));
        // Hidden by default in the catalog
        assert_eq!(list[3].indicator, LayerIndicator::Hidden);
    }
}
