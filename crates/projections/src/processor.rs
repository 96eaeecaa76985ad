//! Feeding committed events to projections.

use event_store::EventStore;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Delivers events from a store to registered projections.
///
/// Catch-up replays the whole log and skips events a projection has already
/// counted, so calling it repeatedly only applies what is new. Runs are
/// serialized: a position check and the matching `handle` call must not
/// interleave with another run.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    running: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            running: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let _running = self.running.lock().await;
        self.catch_up().await
    }

    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        let _running = self.running.lock().await;
        for projection in &self.projections {
            tracing::info!(projection = projection.name(), "rebuilding projection");
            projection.reset().await?;
        }
        self.catch_up().await
    }

    async fn catch_up(&self) -> Result<u64> {
        let mut stream = self.store.stream_all_events().await?;
        let mut seen: u64 = 0;
        let mut applied: u64 = 0;

        while let Some(event) = stream.next().await {
            let event = event?;
            seen += 1;
            for projection in &self.projections {
                if projection.position().await.events_processed() < seen {
                    projection.handle(&event).await?;
                    applied += 1;
                }
            }
        }

        metrics::counter!("projection_events_applied_total").increment(applied);
        tracing::debug!(events = seen, applied, "projection catch-up complete");
        Ok(applied)
    }
}
