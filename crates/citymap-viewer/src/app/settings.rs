use citymap_lib::{IngestConfig, catalog};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Citymap Viewer - Ingests city map layers and prints what a map would draw
pub struct Settings {
    /// JSON catalog of sources (defaults to the built-in Bangkok catalog)
    #[clap(short, long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Base URL for source locations that are not absolute URLs
    #[clap(long, default_value = catalog::DATA_BASE_URL)]
    pub base_url: String,

    /// Read sources from a local directory instead of the network
    #[clap(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Maximum number of fetches in flight at once
    #[clap(long, default_value = "4")]
    pub max_in_flight: usize,

    /// Fetch timeout in seconds, shorter than the poll interval
    #[clap(long, default_value = "30")]
    pub fetch_timeout: u64,

    /// Interval between live source refreshes, in seconds
    #[clap(long, default_value = "60")]
    pub poll_interval: u64,

    /// Retry degraded layers once after the initial ingestion
    #[clap(long, default_value = "false")]
    pub retry: bool,

    /// Number of live source refreshes to run before exiting
    #[clap(long, default_value = "0")]
    pub polls: u32,

    /// Keep refreshing live sources until interrupted
    #[clap(short, long, default_value = "false")]
    pub watch: bool,

    /// Map zoom level of the render pass
    #[clap(short, long, default_value_t = catalog::DEFAULT_ZOOM)]
    pub zoom: f64,

    /// Active basemap (identifier or name)
    #[clap(short, long)]
    pub basemap: Option<String>,

    /// Active measured quantity (AQI, PM25, PM10, O3, CO, NO2, SO2)
    #[clap(short, long, default_value = "AQI")]
    pub quantity: String,

    /// Layers to hide
    #[clap(long, value_name = "ID", value_delimiter = ',')]
    pub hide: Vec<String>,

    /// Layers to show, including those hidden by default
    #[clap(long, value_name = "ID", value_delimiter = ',')]
    pub show: Vec<String>,

    /// Print JSON instead of text
    #[clap(long, default_value = "false")]
    pub json: bool,
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            max_in_flight: self.max_in_flight,
            fetch_timeout: Duration::from_secs(self.fetch_timeout),
            poll_interval: Duration::from_secs(self.poll_interval),
        }
    }
}
