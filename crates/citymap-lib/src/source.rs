//! Source descriptors and the ordered source registry
//!
//! A [`SourceDescriptor`] is pure configuration: where to fetch a source,
//! which decoder understands it, and how its layer is presented by default.
//! The registry is built once at startup and never mutated afterwards.

use crate::{Color, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Inclusive zoom range in which a layer is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl ZoomRange {
    /// Every zoom level a web map uses
    pub const FULL: Self = Self { min: 0, max: 24 };

    pub fn new(min: u8, max: u8) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidCatalog(format!(
                "zoom range min {min} is greater than max {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Whether a (fractional) zoom level falls inside this range
    #[inline]
    pub fn contains(&self, zoom: f64) -> bool {
        zoom >= f64::from(self.min) && zoom <= f64::from(self.max)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Which decoder understands a source, with its decoder-specific configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DecoderKind {
    /// A GeoJSON `FeatureCollection`
    Vector,
    /// Header-delimited text, one point per row
    Tabular {
        longitude_column: String,
        latitude_column: String,
    },
    /// A JSON document holding a list of stations
    LiveApi {
        list_field: String,
        longitude_field: String,
        latitude_field: String,
    },
    /// A source type this pipeline cannot ingest (e.g. ArcGIS map services)
    Unsupported,
}

impl DecoderKind {
    /// Whether sources of this kind are fetched at all
    #[inline]
    pub fn is_fetchable(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Tabular { .. } => "tabular",
            Self::LiveApi { .. } => "live-api",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Marks a source as carrying a per-quantity measured payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSpec {
    /// Property holding the per-station record keyed by quantity
    pub payload_property: String,
}

/// Marks a source for volumetric (3-D extrusion) rendering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionSpec {
    /// Property holding the extrusion height in meters
    pub height_property: String,
    pub color: Color,
    #[serde(default = "default_extrusion_opacity")]
    pub opacity: f32,
}

fn default_extrusion_opacity() -> f32 {
    0.8
}

fn default_visible() -> bool {
    true
}

/// Static catalog entry describing one data source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique, stable identifier
    pub id: String,
    pub decoder: DecoderKind,
    /// Absolute URL, or a path relative to the fetcher's base location
    pub location: String,
    /// Display name shown in the layer list
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub zoom: ZoomRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extrusion: Option<ExtrusionSpec>,
}

impl SourceDescriptor {
    /// Create a visible descriptor with the full zoom range and no presentation hints
    pub fn new(
        id: impl Into<String>,
        decoder: DecoderKind,
        location: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            decoder,
            location: location.into(),
            name: name.into(),
            name_en: None,
            visible: true,
            icon: None,
            zoom: ZoomRange::FULL,
            classification: None,
            extrusion: None,
        }
    }

    pub fn with_name_en(mut self, name_en: impl Into<String>) -> Self {
        self.name_en = Some(name_en.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomRange) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn classified(mut self, payload_property: impl Into<String>) -> Self {
        self.classification = Some(ClassificationSpec {
            payload_property: payload_property.into(),
        });
        self
    }

    pub fn extruded(mut self, height_property: impl Into<String>, color: Color) -> Self {
        self.extrusion = Some(ExtrusionSpec {
            height_property: height_property.into(),
            color,
            opacity: default_extrusion_opacity(),
        });
        self
    }

    /// Whether this source is re-ingested periodically
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self.decoder, DecoderKind::LiveApi { .. })
    }
}

/// Ordered catalog of sources. Order is the layer order of every ingestion.
#[derive(Clone, Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<SourceDescriptor>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SourceRegistry {
    /// Build a registry, validating identifiers and zoom ranges
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for source in &sources {
            if source.id.trim().is_empty() {
                return Err(Error::InvalidCatalog("source with empty id".to_string()));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate source id `{}`",
                    source.id
                )));
            }
            ZoomRange::new(source.zoom.min, source.zoom.max)?;
        }

        Ok(Self {
            sources: sources.into_iter().map(Arc::new).collect(),
        })
    }

    /// Parse a JSON catalog (an array of source descriptors)
    pub fn from_json(text: &str) -> Result<Self> {
        let sources: Vec<SourceDescriptor> = serde_json::from_str(text)
            .map_err(|e| Error::InvalidCatalog(format!("catalog is not valid JSON: {e}")))?;
        Self::new(sources)
    }

    /// Load a JSON catalog file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidCatalog(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    #[inline]
    pub fn sources(&self) -> &[Arc<SourceDescriptor>] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&Arc<SourceDescriptor>> {
        self.sources.iter().find(|source| source.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.id.as_str())
    }

    /// Sources that are re-ingested periodically
    pub fn live_sources(&self) -> impl Iterator<Item = &Arc<SourceDescriptor>> {
        self.sources.iter().filter(|source| source.is_live())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
