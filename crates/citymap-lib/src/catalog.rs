//! Built-in Bangkok city catalog
//!
//! The default sources, basemaps and camera of the Bangkok Metropolitan
//! Administration map. Everything here is data; a JSON catalog file can
//! replace the sources entirely (see [`SourceRegistry::from_json`]).

use crate::{Color, DecoderKind, SourceDescriptor, SourceRegistry, ZoomRange};
use serde::{Deserialize, Serialize};

/// Base location of the static GeoJSON/CSV files
pub const DATA_BASE_URL: &str = "https://raw.githubusercontent.com/Pongpisud1998/bmamap/main/geodata/";

/// Base location of the marker icons
pub const ICON_BASE_URL: &str = "https://raw.githubusercontent.com/Pongpisud1998/bmamap/main/images/";

/// Base location of the basemap style documents
pub const BASEMAP_BASE_URL: &str = "https://raw.githubusercontent.com/Pongpisud1998/bmamap/main/basemap/";

/// Air4Thai live air quality endpoint
pub const AIR4THAI_URL: &str = "http://air4thai.com/forweb/getAQI_JSON.php";

/// Initial camera center (longitude, latitude)
pub const DEFAULT_CENTER: (f64, f64) = (100.5, 13.75);

/// Initial camera zoom
pub const DEFAULT_ZOOM: f64 = 10.0;

/// A selectable basemap style
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basemap {
    pub id: String,
    pub name: String,
    pub style_url: String,
}

impl Basemap {
    pub fn new(id: &str, name: &str, style_url: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            style_url: style_url.into(),
        }
    }
}

/// The fixed set of basemaps. The first one is the default.
pub fn basemaps() -> Vec<Basemap> {
    [
        ("google-hybrid", "Google Hybrid", "ghyb.json"),
        ("osm", "OpenStreetMap", "osm.json"),
        ("esri-world-imagery", "ESRI WorldImagery", "esri.json"),
        ("carto-light", "Carto Light", "cartoLight.json"),
        ("carto-dark", "Carto Dark", "cartoDark.json"),
    ]
    .into_iter()
    .map(|(id, name, file)| Basemap::new(id, name, format!("{BASEMAP_BASE_URL}{file}")))
    .collect()
}

/// Full URL of an icon reference
pub fn icon_url(reference: &str) -> String {
    format!("{ICON_BASE_URL}{reference}")
}

/// The Bangkok source catalog, in layer order
pub fn bangkok() -> SourceRegistry {
    let vector = |id: &str, file: &str, name: &str, name_en: &str| {
        SourceDescriptor::new(id, DecoderKind::Vector, file, name).with_name_en(name_en)
    };

    let sources = vec![
        vector("district", "district.geojson", "เขต", "district"),
        vector("road", "bma_road.geojson", "ถนน", "road"),
        vector("bike_way", "bike_way.geojson", "ทางจักรยาน", "bike way"),
        vector("bma_zone", "bma_zone.geojson", "Zone", "zone"),
        vector("bma_school", "bma_school.geojson", "โรงเรียน", "school")
            .with_icon("school.png")
            .with_zoom(ZoomRange { min: 11, max: 22 }),
        vector(
            "air_pollution",
            "air_pollution.geojson",
            "สถานีตรวจวัด",
            "air pollution station",
        )
        .with_icon("station.png"),
        SourceDescriptor::new(
            "bma_cctv",
            DecoderKind::Tabular {
                longitude_column: "lng".to_string(),
                latitude_column: "lat".to_string(),
            },
            "bma_cctv.csv",
            "กล้อง CCTV",
        )
        .with_name_en("CCTV camera")
        .with_icon("cctv.png")
        .with_zoom(ZoomRange { min: 12, max: 22 }),
        vector("bma_building", "bma_building.geojson", "อาคาร", "building")
            .extruded("height", Color::rgb(0xC8, 0xB8, 0xA0))
            .with_zoom(ZoomRange { min: 14, max: 22 }),
        SourceDescriptor::new(
            "air4thai",
            DecoderKind::LiveApi {
                list_field: "stations".to_string(),
                longitude_field: "Long".to_string(),
                latitude_field: "Lat".to_string(),
            },
            AIR4THAI_URL,
            "Air4Thai",
        )
        .with_name_en("air4thai")
        .with_icon("air.png")
        .classified("AQILast"),
        SourceDescriptor::new(
            "bma_basemap_arcgis",
            DecoderKind::Unsupported,
            "",
            "BMAGI Basemap 2564",
        )
        .with_name_en("BMA basemap (ArcGIS)")
        .hidden(),
    ];

    SourceRegistry::new(sources).expect("built-in catalog is valid")
}
