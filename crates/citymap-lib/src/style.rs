//! Style resolution
//!
//! Decides, per layer and render pass, which primitive the renderer draws and
//! with what parameters. The precedence between presentation hints is fixed:
//! classification beats icon, icon beats extrusion, extrusion beats line.
//! Several catalog entries satisfy more than one rule, so the order matters.

use crate::{
    Color, ExtrusionSpec, Layer, LayerHealth, SelectionState, SeverityClass, SourceDescriptor, ZoomRange,
    classify, utils,
};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use std::sync::Arc;

/// Icon scale used for point markers
pub const ICON_SIZE: f32 = 0.5;

/// Label text size in pixels
pub const LABEL_TEXT_SIZE: f32 = 12.0;

/// Label offset below the marker, in ems
pub const LABEL_TEXT_OFFSET: [f32; 2] = [0.0, 1.2];

const LABEL_HALO_WIDTH: f32 = 1.0;

/// Line color and width of a line layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub width: f32,
}

/// Fixed per-source line styles; unknown sources get blue, 1px
pub fn line_style(source_id: &str) -> LineStyle {
    let (color, width) = match source_id {
        "district" => (Color::rgb(0x6A, 0x5A, 0xCD), 1.5),
        "road" => (Color::rgb(0xF5, 0x9E, 0x0B), 1.0),
        "bike_way" => (Color::rgb(0x10, 0xB9, 0x81), 2.0),
        "bma_zone" => (Color::rgb(0xEF, 0x44, 0x44), 2.0),
        _ => (Color::BLUE, 1.0),
    };
    LineStyle { color, width }
}

/// The rendering rule a source resolves to, in precedence order
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StyleRule<'a> {
    /// Per-feature labels colored by classification of the active quantity
    Classified {
        payload_property: &'a str,
        icon: Option<&'a str>,
    },
    /// Per-feature icon markers
    Icon(&'a str),
    /// Per-feature 3-D extrusions
    Extrusion(&'a ExtrusionSpec),
    /// One homogeneous line style for the whole layer
    Line(LineStyle),
}

impl<'a> StyleRule<'a> {
    pub fn for_source(source: &'a SourceDescriptor) -> Self {
        if let Some(classification) = &source.classification {
            return Self::Classified {
                payload_property: &classification.payload_property,
                icon: source.icon.as_deref(),
            };
        }
        if let Some(icon) = source.icon.as_deref() {
            return Self::Icon(icon);
        }
        if let Some(extrusion) = &source.extrusion {
            return Self::Extrusion(extrusion);
        }
        Self::Line(line_style(&source.id))
    }
}

/// What the renderer draws, with its visual parameters
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Primitive {
    PointIcon {
        position: [f64; 2],
        icon: String,
        size: f32,
    },
    PointLabel {
        position: [f64; 2],
        text: String,
        color: Color,
        severity: SeverityClass,
        label: &'static str,
        text_color: Color,
        text_size: f32,
        text_offset: [f32; 2],
        halo_color: Color,
        halo_width: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
        icon_size: f32,
    },
    Line {
        color: Color,
        width: f32,
        opacity: f32,
    },
    FilledExtrusion {
        height: f64,
        base: f64,
        color: Color,
        opacity: f32,
    },
}

/// Discriminant of a [`Primitive`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    PointIcon,
    PointLabel,
    Line,
    FilledExtrusion,
}

/// One drawing instruction for the renderer
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StyleDescriptor {
    pub primitive: Primitive,
    /// Index of the drawn feature in its layer; `None` for layer-wide styles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_index: Option<usize>,
    pub zoom_range: ZoomRange,
}

impl StyleDescriptor {
    pub fn kind(&self) -> PrimitiveKind {
        match self.primitive {
            Primitive::PointIcon { .. } => PrimitiveKind::PointIcon,
            Primitive::PointLabel { .. } => PrimitiveKind::PointLabel,
            Primitive::Line { .. } => PrimitiveKind::Line,
            Primitive::FilledExtrusion { .. } => PrimitiveKind::FilledExtrusion,
        }
    }
}

/// Resolve the style descriptors of one layer for the current render pass
pub fn resolve(layer: &Layer, zoom: f64, selection: &SelectionState) -> Vec<StyleDescriptor> {
    let source = layer.source();
    if !selection.layer_visible(layer) || !source.zoom.contains(zoom) {
        return Vec::new();
    }
    // Sources without a decoder (raster basemaps) have nothing to style
    if matches!(layer.health(), LayerHealth::Skipped) {
        return Vec::new();
    }

    let zoom_range = source.zoom;
    let features = layer.features().iter().enumerate();
    let descriptor = |primitive, feature_index| StyleDescriptor {
        primitive,
        feature_index,
        zoom_range,
    };

    match StyleRule::for_source(source) {
        StyleRule::Classified {
            payload_property,
            icon,
        } => {
            let quantity = selection.active_quantity();
            let icon = icon.map(|icon| utils::icon_id(icon).to_string());
            features
                .filter_map(|(index, feature)| {
                    let position = feature.coordinates()?;
                    let result = classify(feature, quantity, payload_property)?;
                    let primitive = Primitive::PointLabel {
                        position,
                        text: result.value.to_string(),
                        color: result.color,
                        severity: result.severity,
                        label: result.label,
                        text_color: Color::BLACK,
                        text_size: LABEL_TEXT_SIZE,
                        text_offset: LABEL_TEXT_OFFSET,
                        halo_color: Color::WHITE,
                        halo_width: LABEL_HALO_WIDTH,
                        icon: icon.clone(),
                        icon_size: ICON_SIZE,
                    };
                    Some(descriptor(primitive, Some(index)))
                })
                .collect()
        }
        StyleRule::Icon(icon) => {
            let icon = utils::icon_id(icon);
            features
                .filter_map(|(index, feature)| {
                    let primitive = Primitive::PointIcon {
                        position: feature.coordinates()?,
                        icon: icon.to_string(),
                        size: ICON_SIZE,
                    };
                    Some(descriptor(primitive, Some(index)))
                })
                .collect()
        }
        StyleRule::Extrusion(extrusion) => features
            .filter(|(_, feature)| feature.is_renderable() && feature.position().is_none())
            .map(|(index, feature)| {
                let height = feature
                    .property(&extrusion.height_property)
                    .and_then(utils::parse_number)
                    .unwrap_or(0.0)
                    .max(0.0);
                let primitive = Primitive::FilledExtrusion {
                    height,
                    base: 0.0,
                    color: extrusion.color,
                    opacity: extrusion.opacity,
                };
                descriptor(primitive, Some(index))
            })
            .collect(),
        StyleRule::Line(LineStyle { color, width }) => {
            let primitive = Primitive::Line {
                color,
                width,
                opacity: 1.0,
            };
            vec![descriptor(primitive, None)]
        }
    }
}

/// A layer paired with its descriptors for one render pass
#[derive(Clone, Debug, Serialize)]
pub struct LayerStyle {
    #[serde(rename = "layer", serialize_with = "serialize_layer_id")]
    pub layer: Arc<Layer>,
    pub descriptors: Vec<StyleDescriptor>,
}

fn serialize_layer_id<S: Serializer>(layer: &Arc<Layer>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(layer.id())
}

/// Resolve a full render pass, one entry per layer in layer order
///
/// Layers are resolved in parallel; the result keeps the input order.
pub fn resolve_all(layers: &[Arc<Layer>], zoom: f64, selection: &SelectionState) -> Vec<LayerStyle> {
    #[cfg(feature = "profiling")]
    profiling::scope!("style::resolve_all");

    layers
        .par_iter()
        .map(|layer| LayerStyle {
            layer: Arc::clone(layer),
            descriptors: resolve(layer, zoom, selection),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecoderKind, Feature, Geometry, Properties, catalog};
    use serde_json::json;

    fn selection() -> SelectionState {
        SelectionState::for_registry(&catalog::bangkok(), catalog::basemaps()).unwrap()
    }

    fn point(lon: f64, lat: f64, properties: serde_json::Value) -> Feature {
        let serde_json::Value::Object(properties) = properties else {
            panic!("properties must be an object");
        };
        Feature::new(Geometry::Point(geo::Point::new(lon, lat)), properties)
    }

    fn polygon(properties: serde_json::Value) -> Feature {
        let raw = json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]});
        let serde_json::Value::Object(properties) = properties else {
            panic!("properties must be an object");
        };
        Feature::new(
            Geometry::Opaque {
                kind: crate::GeometryKind::Polygon,
                raw,
            },
            properties,
        )
    }

    fn layer(source: SourceDescriptor, features: Vec<Feature>) -> Layer {
        Layer::healthy(Arc::new(source), features)
    }

    fn vector(id: &str) -> SourceDescriptor {
        SourceDescriptor::new(id, DecoderKind::Vector, format!("{id}.geojson"), id)
    }

    fn station(color_id: &str, aqi: &str) -> Feature {
        point(
            100.5,
            13.7,
            json!({"AQILast": {"AQI": {"color_id": color_id, "aqi": aqi}}}),
        )
    }

    #[test]
    fn test_line_layer_gets_one_descriptor() {
        let layer = layer(vector("road"), vec![polygon(json!({})), polygon(json!({}))]);
        let descriptors = resolve(&layer, 12.0, &selection());
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].feature_index, None);
        assert_eq!(
            descriptors[0].primitive,
            Primitive::Line {
                color: Color::rgb(0xF5, 0x9E, 0x0B),
                width: 1.0,
                opacity: 1.0
            }
        );
    }

    #[test]
    fn test_unknown_source_gets_default_line() {
        assert_eq!(
            line_style("something_new"),
            LineStyle {
                color: Color::BLUE,
                width: 1.0
            }
        );
    }

    #[test]
    fn test_hidden_layer_produces_nothing() {
        let layer = layer(vector("road"), vec![]);
        let mut selection = selection();
        selection.set_layer_visible("road", false).unwrap();
        assert!(resolve(&layer, 12.0, &selection).is_empty());

        let hidden_by_default = self::layer(vector("bma_basemap_arcgis").hidden(), vec![]);
        assert!(resolve(&hidden_by_default, 12.0, &self::selection()).is_empty());
    }

    #[test]
    fn test_skipped_layer_produces_nothing() {
        let arcgis = SourceDescriptor::new(
            "bma_basemap_arcgis",
            DecoderKind::Unsupported,
            "MapServer",
            "BMA Basemap",
        )
        .hidden();
        let layer = Layer::skipped(Arc::new(arcgis));
        let mut selection = selection();
        selection.set_layer_visible("bma_basemap_arcgis", true).unwrap();

        assert!(selection.layer_visible(&layer));
        assert!(resolve(&layer, 12.0, &selection).is_empty());
    }

    #[test]
    fn test_zoom_outside_range_produces_nothing() {
        let source = vector("bma_school")
            .with_icon("school.png")
            .with_zoom(ZoomRange { min: 11, max: 22 });
        let layer = layer(source, vec![point(100.5, 13.7, json!({}))]);
        assert!(resolve(&layer, 10.0, &selection()).is_empty());
        assert_eq!(resolve(&layer, 11.0, &selection()).len(), 1);
    }

    #[test]
    fn test_icon_layer_skips_non_renderable_points() {
        let source = vector("bma_cctv").with_icon("cctv.png");
        let layer = layer(
            source,
            vec![
                point(100.5, 13.7, json!({})),
                Feature::new(Geometry::InvalidPoint, Properties::new()),
                point(100.6, 13.8, json!({})),
            ],
        );

        let descriptors = resolve(&layer, 15.0, &selection());
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[1].feature_index, Some(2));
        assert_eq!(
            descriptors[0].primitive,
            Primitive::PointIcon {
                position: [100.5, 13.7],
                icon: "cctv".into(),
                size: ICON_SIZE
            }
        );
    }

    #[test]
    fn test_icon_beats_extrusion() {
        let source = vector("bma_building")
            .extruded("height", Color::WHITE)
            .with_icon("building.png");
        let layer = layer(
            source,
            vec![point(100.5, 13.7, json!({"height": 30})), polygon(json!({"height": 30}))],
        );

        let descriptors = resolve(&layer, 15.0, &selection());
        assert!(!descriptors.is_empty());
        assert!(descriptors.iter().all(|d| d.kind() == PrimitiveKind::PointIcon));
    }

    #[test]
    fn test_classification_beats_icon() {
        let source = vector("air4thai").with_icon("air.png").classified("AQILast");
        let layer = layer(source, vec![station("2", "35")]);

        let descriptors = resolve(&layer, 12.0, &selection());
        assert_eq!(descriptors.len(), 1);
        match &descriptors[0].primitive {
            Primitive::PointLabel {
                text, color, icon, ..
            } => {
                assert_eq!(text, "35");
                assert_eq!(*color, SeverityClass::Good.color());
                assert_eq!(icon.as_deref(), Some("air"));
            }
            other => panic!("expected a point label, got {other:?}"),
        }
    }

    #[test]
    fn test_classified_layer_skips_unclassifiable_features() {
        let source = vector("air4thai").classified("AQILast");
        let layer = layer(
            source,
            vec![
                station("99", "40"),
                station("1", "-1"),
                point(100.5, 13.7, json!({})),
                station("5", "180"),
            ],
        );

        let descriptors = resolve(&layer, 12.0, &selection());
        let indices: Vec<_> = descriptors.iter().map(|d| d.feature_index).collect();
        assert_eq!(indices, vec![Some(0), Some(3)]);
        match &descriptors[0].primitive {
            Primitive::PointLabel { color, .. } => {
                assert_eq!(*color, crate::classify::NEUTRAL_COLOR)
            }
            other => panic!("expected a point label, got {other:?}"),
        }
    }

    #[test]
    fn test_classification_follows_active_quantity() {
        let source = vector("air4thai").classified("AQILast");
        let feature = point(
            100.5,
            13.7,
            json!({"AQILast": {
                "AQI": {"color_id": "2", "aqi": "35"},
                "PM25": {"color_id": "4", "aqi": "110", "value": "52.5"}
            }}),
        );
        let layer = layer(source, vec![feature]);
        let mut selection = selection();

        selection.set_active_quantity("PM25").unwrap();
        let descriptors = resolve(&layer, 12.0, &selection);
        match &descriptors[0].primitive {
            Primitive::PointLabel { text, severity, .. } => {
                assert_eq!(text, "52.5");
                assert_eq!(*severity, SeverityClass::UnhealthyForSensitiveGroups);
            }
            other => panic!("expected a point label, got {other:?}"),
        }

        selection.set_active_quantity("SO2").unwrap();
        assert!(resolve(&layer, 12.0, &selection).is_empty());
    }

    #[test]
    fn test_extrusion_heights() {
        let source = vector("bma_building").extruded("height", Color::WHITE);
        let layer = layer(
            source,
            vec![
                polygon(json!({"height": 42.5})),
                polygon(json!({"height": "12"})),
                polygon(json!({})),
                point(100.5, 13.7, json!({"height": 10})),
                polygon(json!({"height": -3})),
            ],
        );

        let heights: Vec<_> = resolve(&layer, 16.0, &selection())
            .into_iter()
            .map(|d| match d.primitive {
                Primitive::FilledExtrusion { height, .. } => height,
                other => panic!("expected an extrusion, got {other:?}"),
            })
            .collect();
        assert_eq!(heights, vec![42.5, 12.0, 0.0, 0.0]);
    }

    #[test]
    fn test_resolve_all_keeps_layer_order() {
        let layers: Vec<Arc<Layer>> = ["district", "road", "bike_way", "bma_zone"]
            .into_iter()
            .map(|id| Arc::new(layer(vector(id), vec![])))
            .collect();

        let pass = resolve_all(&layers, 12.0, &selection());
        let ids: Vec<_> = pass.iter().map(|style| style.layer.id()).collect();
        assert_eq!(ids, vec!["district", "road", "bike_way", "bma_zone"]);
        assert!(pass.iter().all(|style| style.descriptors.len() == 1));
    }

    #[test]
    fn test_layer_style_serializes_layer_id() {
        let layers = vec![Arc::new(layer(vector("road"), vec![]))];
        let pass = resolve_all(&layers, 12.0, &selection());
        let value = serde_json::to_value(&pass[0]).unwrap();
        assert_eq!(value["layer"], json!("road"));
        assert_eq!(value["descriptors"][0]["primitive"]["kind"], json!("line"));
        assert_eq!(value["descriptors"][0]["primitive"]["color"], json!("#F59E0B"));
    }
}
