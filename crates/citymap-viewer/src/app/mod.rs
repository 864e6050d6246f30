//! Application module
//!
//! Wires the library together the way a map screen would:
//! - Load the catalog and apply the command-line selection
//! - Ingest every source once, optionally retrying degraded layers
//! - Refresh live sources a fixed number of times, or until interrupted
//! - Print a render pass after every change

pub(crate) mod report;
pub(crate) mod settings;
mod state;

use crate::app::settings::Settings;
use crate::app::state::ViewerState;
use citymap_lib::{
    DirectoryFetcher, Fetcher, HttpFetcher, Ingestor, LivePoller, PollOutcome, SourceRegistry,
    catalog,
};
use std::io::Write;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Error types for the viewer
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Citymap(#[from] citymap_lib::Error),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Run the viewer with the given settings, printing to stdout
pub async fn run(settings: Settings) -> Result<()> {
    let registry = match &settings.catalog {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog");
            SourceRegistry::from_file(path)?
        }
        None => catalog::bangkok(),
    };

    let mut stdout = std::io::stdout().lock();
    match &settings.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "Reading sources from a local directory");
            run_with(&settings, registry, DirectoryFetcher::new(dir), &mut stdout).await
        }
        None => {
            let fetcher = HttpFetcher::new(&settings.base_url, settings.ingest_config().fetch_timeout)?;
            run_with(&settings, registry, fetcher, &mut stdout).await
        }
    }
}

async fn run_with<F: Fetcher + 'static>(
    settings: &Settings,
    registry: SourceRegistry,
    fetcher: F,
    out: &mut dyn Write,
) -> Result<()> {
    let config = settings.ingest_config();
    config.validate()?;
    let ingestor = Arc::new(Ingestor::new(fetcher, config));
    let state = ViewerState::new(registry, settings.zoom)?;
    state.apply_settings(settings)?;

    let mut layers = ingestor.ingest(&state.registry).await;
    if settings.retry && layers.iter().any(|layer| layer.is_degraded()) {
        layers = ingestor.retry_degraded(layers).await;
    }
    for error in layers.iter().filter_map(|layer| layer.error()) {
        warn!(error = %error, "Layer unavailable");
    }
    state.store.replace_all(layers);
    state.render_pass().write(out, settings.json)?;

    let pollers: Vec<_> = state
        .registry
        .live_sources()
        .map(|source| {
            Arc::new(LivePoller::new(
                Arc::clone(&ingestor),
                Arc::clone(source),
                Arc::clone(&state.store),
            ))
        })
        .collect();
    if pollers.is_empty() {
        debug!("No live sources to refresh");
        return Ok(());
    }

    for round in 1..=settings.polls {
        tokio::time::sleep(config.poll_interval).await;
        for poller in &pollers {
            if let PollOutcome::Applied { features, degraded, .. } = poller.poll().await {
                info!(round, layer = %poller.source().id, features, degraded, "Live layer refreshed");
            }
        }
        state.render_pass().write(out, settings.json)?;
    }

    if settings.watch {
        watch(&state, pollers, settings, out).await?;
    }
    Ok(())
}

/// Refresh live sources on the poll interval until Ctrl-C
async fn watch<F: Fetcher + 'static>(
    state: &ViewerState,
    pollers: Vec<Arc<LivePoller<F>>>,
    settings: &Settings,
    out: &mut dyn Write,
) -> Result<()> {
    let interval = settings.ingest_config().poll_interval;
    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();
    for poller in pollers {
        tasks.spawn(poller.run(interval, cancel.clone()));
    }

    // Report halfway between refreshes so each report sees the latest poll
    let mut reports = tokio::time::interval_at(Instant::now() + interval + interval / 2, interval);
    reports.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(interval_secs = interval.as_secs(), "Watching live sources, press Ctrl-C to stop");
    let result = loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                break Ok(());
            }
            _ = reports.tick() => {
                if let Err(e) = state.render_pass().write(out, settings.json) {
                    break Err(e.into());
                }
            }
        }
    };

    cancel.cancel();
    while tasks.join_next().await.is_some() {}
    info!("Stopped watching");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use citymap_lib::MemoryFetcher;
    use clap::Parser;
    use serde_json::{Value, json};

    const ROADS: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[100.5, 13.7], [100.6, 13.8]]}, "properties": {}}
    ]}"#;

    fn settings(args: &[&str]) -> Settings {
        Settings::parse_from(std::iter::once("citymap-viewer").chain(args.iter().copied()))
    }

    fn stations() -> String {
        json!({"stations": [{
            "stationID": "02t",
            "Lat": "13.836",
            "Long": "100.596",
            "AQILast": {"AQI": {"color_id": "3", "aqi": "72"}}
        }]})
        .to_string()
    }

    fn reports(out: &[u8]) -> Vec<Value> {
        out.split(|byte| *byte == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_single_pass_over_bangkok_catalog() {
        let fetcher = MemoryFetcher::new()
            .with("bma_road.geojson", ROADS)
            .with("bma_cctv.csv", "name,lng,lat\nA,100.5,13.7\nB,bad,13.8\n")
            .with(catalog::AIR4THAI_URL, stations());
        let mut out = Vec::new();

        run_with(
            &settings(&["--json", "--zoom", "12"]),
            catalog::bangkok(),
            fetcher,
            &mut out,
        )
        .await
        .unwrap();

        let reports = reports(&out);
        assert_eq!(reports.len(), 1);
        let layers = reports[0]["layers"].as_array().unwrap();
        let indicator = |id: &str| {
            layers
                .iter()
                .find(|entry| entry["id"] == id)
                .map(|entry| entry["indicator"].clone())
                .unwrap()
        };
        assert_eq!(layers.len(), 10);
        assert_eq!(indicator("road"), "shown");
        assert_eq!(indicator("district"), "degraded");
        assert_eq!(indicator("bma_cctv"), "shown");
        assert_eq!(indicator("air4thai"), "shown");
        assert_eq!(indicator("bma_basemap_arcgis"), "hidden");

        let air4thai = reports[0]["styles"]
            .as_array()
            .unwrap()
            .iter()
            .find(|style| style["layer"] == "air4thai")
            .unwrap();
        let label = &air4thai["descriptors"][0]["primitive"];
        assert_eq!(label["kind"], "point-label");
        assert_eq!(label["text"], "72");
        assert_eq!(label["color"], "#FFFF00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_print_a_pass_each() {
        let fetcher = MemoryFetcher::new().with(catalog::AIR4THAI_URL, stations());
        let mut out = Vec::new();

        run_with(
            &settings(&["--json", "--polls", "2"]),
            catalog::bangkok(),
            fetcher,
            &mut out,
        )
        .await
        .unwrap();

        let reports = reports(&out);
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|report| report["layers"].as_array().unwrap().len() == 10));
    }

    #[tokio::test]
    async fn test_invalid_selection_fails_before_ingesting() {
        let fetcher = MemoryFetcher::new();
        let mut out = Vec::new();

        let result = run_with(
            &settings(&["--basemap", "mapbox"]),
            catalog::bangkok(),
            fetcher,
            &mut out,
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::Citymap(citymap_lib::Error::InvalidSelection(_)))
        ));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_must_be_shorter_than_poll_interval() {
        let fetcher = MemoryFetcher::new().with(catalog::AIR4THAI_URL, stations());
        let mut out = Vec::new();

        let result = run_with(
            &settings(&["--fetch-timeout", "60", "--poll-interval", "60", "--polls", "1"]),
            catalog::bangkok(),
            fetcher,
            &mut out,
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::Citymap(citymap_lib::Error::InvalidConfig(_)))
        ));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let catalog_path = dir.path().join("catalog.json");
        std::fs::write(
            &catalog_path,
            r#"[{"id": "road", "decoder": {"kind": "vector"}, "location": "road.geojson", "name": "Road"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("road.geojson"), ROADS).unwrap();

        let settings = settings(&[
            "--catalog",
            catalog_path.to_str().unwrap(),
            "--data-dir",
            dir.path().to_str().unwrap(),
        ]);
        let registry = SourceRegistry::from_file(settings.catalog.as_ref().unwrap()).unwrap();
        let mut out = Vec::new();
        run_with(&settings, registry, DirectoryFetcher::new(dir.path()), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("road"));
        assert!(text.ends_with("1 layers: 1 shown, 0 hidden, 0 degraded, 0 unsupported; 1 descriptors\n"));
    }
}
