//! Periodic re-ingestion of live sources
//!
//! Each poll takes a generation number when it is issued. A completing poll
//! is applied only if it is still the most recently issued one, so a slow
//! poll can never overwrite the result of a newer one.

use crate::{Fetcher, Ingestor, Layer, LayerStore, SourceDescriptor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to a completed poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The result replaced the layer in the store
    Applied {
        generation: u64,
        features: usize,
        degraded: bool,
    },
    /// A newer poll was issued meanwhile; the result was discarded
    Stale { generation: u64, latest: u64 },
}

/// Re-ingests one live source into a [`LayerStore`]
#[derive(Debug)]
pub struct LivePoller<F> {
    ingestor: Arc<Ingestor<F>>,
    source: Arc<SourceDescriptor>,
    store: Arc<LayerStore>,
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl<F: Fetcher + 'static> LivePoller<F> {
    pub fn new(ingestor: Arc<Ingestor<F>>, source: Arc<SourceDescriptor>, store: Arc<LayerStore>) -> Self {
        Self {
            ingestor,
            source,
            store,
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
        }
    }

    #[inline]
    pub fn source(&self) -> &Arc<SourceDescriptor> {
        &self.source
    }

    /// Generation of the most recently issued poll (0 before the first)
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Generation of the most recently applied poll (0 before the first)
    pub fn applied(&self) -> u64 {
        *self.applied.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a poll
    ///
    /// The generation is taken immediately, when this is called, not when the
    /// returned future is first polled.
    pub fn poll(self: &Arc<Self>) -> impl Future<Output = PollOutcome> + Send + use<F> {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let poller = Arc::clone(self);
        async move {
            debug!(layer = %poller.source.id, generation, "Poll issued");
            let layer = poller.ingestor.ingest_source(&poller.source).await;
            poller.complete(generation, layer)
        }
    }

    fn complete(&self, generation: u64, layer: Layer) -> PollOutcome {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        let latest = self.issued.load(Ordering::SeqCst);
        if generation != latest || generation <= *applied {
            debug!(
                layer = %self.source.id,
                generation,
                latest,
                "Discarding stale poll result"
            );
            return PollOutcome::Stale { generation, latest };
        }

        let features = layer.feature_count();
        let degraded = layer.is_degraded();
        self.store.replace(layer);
        *applied = generation;
        PollOutcome::Applied {
            generation,
            features,
            degraded,
        }
    }

    /// Poll every `interval` until `cancel` fires
    ///
    /// The first poll happens one interval after the start; the initial
    /// ingestion is expected to have loaded the layer already. Each tick's
    /// poll runs as its own task so a slow fetch never delays the next tick.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        info!(
            layer = %self.source.id,
            interval_secs = interval.as_secs_f64(),
            "Live poller started"
        );
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    polls.spawn(self.poll());
                }
                Some(result) = polls.join_next(), if !polls.is_empty() => match result {
                    Ok(PollOutcome::Applied { generation, features, degraded }) => info!(
                        layer = %self.source.id,
                        generation,
                        features,
                        degraded,
                        "Live layer refreshed"
                    ),
                    Ok(PollOutcome::Stale { .. }) => {}
                    Err(e) => warn!(layer = %self.source.id, error = %e, "Poll task panicked"),
                },
            }
        }

        polls.abort_all();
        info!(layer = %self.source.id, "Live poller stopped");
    }
}
