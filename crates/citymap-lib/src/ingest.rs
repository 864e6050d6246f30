//! Layer ingestion
//!
//! Fetches and decodes every source of a registry with bounded concurrency.
//! A failure in one source never affects another: it becomes an empty,
//! degraded layer and the batch carries on.

use crate::{Error, Fetcher, Layer, Result, SourceDescriptor, SourceRegistry, decode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Ingestion tunables
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngestConfig {
    /// Maximum number of fetches in flight at once
    pub max_in_flight: usize,
    /// Upper bound on a single fetch; exceeding it degrades the layer
    pub fetch_timeout: Duration,
    /// Period between re-ingestions of live sources
    pub poll_interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 4,
            fetch_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(60),
        }
    }
}

impl IngestConfig {
    /// Check the tunables can make progress
    ///
    /// A live poller issues a new generation every `poll_interval` and drops
    /// the results of older ones, so a fetch allowed to run a full interval
    /// could be superseded forever by a consistently slow upstream.
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(Error::InvalidConfig(
                "at least one fetch must be allowed in flight".into(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig("poll interval must be positive".into()));
        }
        if self.fetch_timeout >= self.poll_interval {
            return Err(Error::InvalidConfig(format!(
                "fetch timeout ({:?}) must be shorter than the poll interval ({:?})",
                self.fetch_timeout, self.poll_interval
            )));
        }
        Ok(())
    }
}

/// Turns source descriptors into layers
#[derive(Debug)]
pub struct Ingestor<F> {
    fetcher: Arc<F>,
    config: IngestConfig,
    limiter: Arc<Semaphore>,
}

impl<F: Fetcher + 'static> Ingestor<F> {
    pub fn new(fetcher: F, config: IngestConfig) -> Self {
        Self::with_shared_fetcher(Arc::new(fetcher), config)
    }

    pub fn with_shared_fetcher(fetcher: Arc<F>, config: IngestConfig) -> Self {
        // A zero limit would never admit a fetch
        let permits = config.max_in_flight.max(1);
        Self {
            fetcher,
            config,
            limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    #[inline]
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    #[inline]
    pub fn fetcher(&self) -> &Arc<F> {
        &self.fetcher
    }

    /// Ingest every source of the registry
    ///
    /// Returns exactly one layer per source, in registry order, regardless of
    /// the order in which fetches complete. Never fails as a whole.
    pub async fn ingest(&self, registry: &SourceRegistry) -> Vec<Layer> {
        let started = Instant::now();
        let sources = registry.sources();
        let mut slots: Vec<Option<Layer>> = Vec::with_capacity(sources.len());
        slots.resize_with(sources.len(), || None);

        let mut tasks = JoinSet::new();
        for (index, source) in sources.iter().enumerate() {
            let task = self.task(Arc::clone(source));
            tasks.spawn(async move { (index, task.await) });
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((index, layer)) => slots[index] = Some(layer),
                Err(e) => warn!(error = %e, "Ingestion task panicked"),
            }
        }

        let layers: Vec<Layer> = slots
            .into_iter()
            .zip(sources)
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| {
                    Layer::degraded(
                        Arc::clone(source),
                        Error::FetchFailure {
                            location: source.location.clone(),
                            reason: "ingestion task aborted".to_string(),
                        },
                    )
                })
            })
            .collect();

        let degraded = layers.iter().filter(|layer| layer.is_degraded()).count();
        info!(
            sources = layers.len(),
            degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Ingestion complete"
        );
        layers
    }

    /// Ingest a single source
    pub async fn ingest_source(&self, source: &Arc<SourceDescriptor>) -> Layer {
        self.task(Arc::clone(source)).await
    }

    /// Re-ingest the degraded layers of a batch, leaving the others untouched
    pub async fn retry_degraded(&self, layers: Vec<Layer>) -> Vec<Layer> {
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<Layer>> = Vec::with_capacity(layers.len());
        for (index, layer) in layers.into_iter().enumerate() {
            if layer.is_degraded() {
                debug!(layer = layer.id(), "Retrying degraded layer");
                let task = self.task(Arc::clone(layer.source()));
                tasks.spawn(async move { (index, task.await) });
            }
            slots.push(Some(layer));
        }

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((index, layer)) => slots[index] = Some(layer),
                Err(e) => warn!(error = %e, "Retry task panicked"),
            }
        }

        slots.into_iter().flatten().collect()
    }

    /// A `'static` future ingesting one source
    fn task(&self, source: Arc<SourceDescriptor>) -> impl Future<Output = Layer> + Send + use<F> {
        let fetcher = Arc::clone(&self.fetcher);
        let limiter = Arc::clone(&self.limiter);
        let timeout = self.config.fetch_timeout;
        ingest_one(fetcher, limiter, timeout, source)
    }
}

async fn ingest_one<F: Fetcher>(
    fetcher: Arc<F>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
    source: Arc<SourceDescriptor>,
) -> Layer {
    if !source.decoder.is_fetchable() {
        debug!(layer = %source.id, "Skipping unsupported source");
        return Layer::skipped(source);
    }

    let bytes = {
        // The permit bounds fetches only; decoding runs outside it
        let _permit = match limiter.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return Layer::degraded(
                    source.clone(),
                    Error::FetchFailure {
                        location: source.location.clone(),
                        reason: "ingestor shut down".to_string(),
                    },
                );
            }
        };
        match tokio::time::timeout(timeout, fetcher.fetch(&source.location)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchFailure {
                location: source.location.clone(),
                reason: format!("timed out after {}s", timeout.as_secs_f64()),
            }),
        }
    };

    let features = bytes.and_then(|bytes| {
        #[cfg(feature = "profiling")]
        profiling::scope!("ingest::decode", source.id.as_str());
        decode::decode(&source.decoder, &bytes)
    });

    match features {
        Ok(features) => {
            debug!(
                layer = %source.id,
                features = features.len(),
                "Layer ingested"
            );
            Layer::healthy(source, features)
        }
        Err(e) => {
            warn!(layer = %source.id, error = %e, "Layer degraded");
            Layer::degraded(source, e)
        }
    }
}
