//! Normalized feature representation
//!
//! Every decoder produces the same [`Feature`] type regardless of whether the
//! source was a GeoJSON file, a CSV table or a live JSON API.

use geo::Point;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// Property mapping of a feature (string keys, arbitrary JSON values)
pub type Properties = Map<String, Value>;

/// GeoJSON geometry types accepted by the vector decoder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    /// Look up a kind by its GeoJSON `type` member
    pub fn from_type_name(name: &str) -> Option<Self> {
        Some(match name {
            "Point" => Self::Point,
            "MultiPoint" => Self::MultiPoint,
            "LineString" => Self::LineString,
            "MultiLineString" => Self::MultiLineString,
            "Polygon" => Self::Polygon,
            "MultiPolygon" => Self::MultiPolygon,
            "GeometryCollection" => Self::GeometryCollection,
            _ => return None,
        })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }
}

/// Geometry of a feature
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A longitude/latitude point
    Point(Point<f64>),
    /// A point whose coordinates were missing or unparseable; never rendered
    InvalidPoint,
    /// Any other geometry, passed through unchanged from a vector source
    Opaque { kind: GeometryKind, raw: Value },
}

impl Geometry {
    /// Whether the renderer can draw this geometry at all
    #[inline]
    pub fn is_renderable(&self) -> bool {
        !matches!(self, Self::InvalidPoint)
    }

    /// GeoJSON representation (`null` for invalid points)
    pub fn to_geojson(&self) -> Value {
        match self {
            Self::Point(point) => serde_json::json!({
                "type": "Point",
                "coordinates": [point.x(), point.y()],
            }),
            Self::InvalidPoint => Value::Null,
            Self::Opaque { raw, .. } => raw.clone(),
        }
    }
}

/// A single decoded feature. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
    geometry: Geometry,
    properties: Properties,
}

impl Feature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    #[inline]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Point position, if this is a renderable point feature
    #[inline]
    pub fn position(&self) -> Option<Point<f64>> {
        match self.geometry {
            Geometry::Point(point) => Some(point),
            _ => None,
        }
    }

    /// `[longitude, latitude]` of a renderable point feature
    #[inline]
    pub fn coordinates(&self) -> Option<[f64; 2]> {
        self.position().map(|point| [point.x(), point.y()])
    }

    #[inline]
    pub fn is_renderable(&self) -> bool {
        self.geometry.is_renderable()
    }
}

/// Features serialize as GeoJSON `Feature` objects
impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("type", "Feature")?;
        map.serialize_entry("geometry", &self.geometry.to_geojson())?;
        map.serialize_entry("properties", &self.properties)?;
        map.end()
    }
}
