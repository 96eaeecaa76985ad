use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version,
    store::{EventStore, EventStream, StreamWrite, validate_writes},
};

#[derive(Debug, Default)]
struct Log {
    /// Every event in commit order.
    events: Vec<EventEnvelope>,
    /// Current version of each stream that has events.
    heads: HashMap<AggregateId, Version>,
}

impl Log {
    fn head(&self, aggregate_id: AggregateId) -> Version {
        self.heads
            .get(&aggregate_id)
            .copied()
            .unwrap_or_else(Version::initial)
    }
}

/// Event store kept entirely in process memory.
///
/// Used by tests and by the API when no database is configured. A single
/// write lock covers the whole log, so multi-stream appends are atomic.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn event_count(&self) -> usize {
        self.log.read().await.events.len()
    }
}

fn conflict(aggregate_id: AggregateId, expected: Version, actual: Version) -> EventStoreError {
    metrics::counter!("event_store_conflicts_total").increment(1);
    EventStoreError::ConcurrencyConflict {
        aggregate_id,
        expected,
        actual,
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_streams(&self, writes: Vec<StreamWrite>) -> Result<Vec<Version>> {
        validate_writes(&writes)?;

        let mut log = self.log.write().await;

        // All checks pass before anything is written.
        for write in &writes {
            let actual = log.head(write.aggregate_id);
            if let Some(expected) = write.options.expected_version
                && actual != expected
            {
                return Err(conflict(write.aggregate_id, expected, actual));
            }
            if let Some(first) = write.events.first()
                && first.version != actual.next()
            {
                return Err(conflict(
                    write.aggregate_id,
                    Version::new(first.version.as_i64() - 1),
                    actual,
                ));
            }
        }

        let mut heads = Vec::with_capacity(writes.len());
        for write in writes {
            let head = match write.events.last() {
                Some(last) => last.version,
                None => log.head(write.aggregate_id),
            };
            if !write.events.is_empty() {
                log.heads.insert(write.aggregate_id, head);
                log.events.extend(write.events);
            }
            heads.push(head);
        }

        Ok(heads)
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        // Commit order within a stream is version order.
        Ok(log
            .events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect())
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        let matching = log
            .events
            .iter()
            .filter(|e| query.matches(&e.aggregate_type, &e.event_type, e.timestamp))
            .cloned();

        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        let events = self.log.read().await.events.clone();
        Ok(Box::pin(futures_util::stream::iter(
            events.into_iter().map(Ok),
        )))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        Ok(self.log.read().await.heads.get(&aggregate_id).copied())
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.aggregate_id, snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        Ok(self.snapshots.read().await.get(&aggregate_id).cloned())
    }
}
