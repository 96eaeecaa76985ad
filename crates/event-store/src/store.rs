use std::collections::HashSet;
use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version};

/// Version expectation for a single stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendOptions {
    /// Version the stream must be at before the write. `None` skips the check;
    /// the write still fails if its first event does not follow the head.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// The stream must not have any events yet.
    pub fn expect_new() -> Self {
        Self::expect_version(Version::initial())
    }
}

/// One stream's share of an atomic multi-stream append.
///
/// A write with no events is a pure assertion: the batch only commits if the
/// stream is still at the expected version.
#[derive(Debug, Clone)]
pub struct StreamWrite {
    pub aggregate_id: AggregateId,
    pub options: AppendOptions,
    pub events: Vec<EventEnvelope>,
}

impl StreamWrite {
    pub fn new(aggregate_id: AggregateId, events: Vec<EventEnvelope>, options: AppendOptions) -> Self {
        Self {
            aggregate_id,
            options,
            events,
        }
    }

    /// Asserts the stream is still at `version` without writing to it.
    pub fn assert_version(aggregate_id: AggregateId, version: Version) -> Self {
        Self::new(aggregate_id, Vec::new(), AppendOptions::expect_version(version))
    }

    /// Asserts the stream has never been written.
    pub fn assert_absent(aggregate_id: AggregateId) -> Self {
        Self::assert_version(aggregate_id, Version::initial())
    }
}

/// A stream of events in commit order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Append-only event storage with optimistic concurrency.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends to several streams as one unit.
    ///
    /// Either every write's version expectation holds and all events are
    /// persisted, or nothing is persisted and `ConcurrencyConflict` is
    /// returned. The returned versions are the new stream heads, in the order
    /// of `writes`.
    async fn append_streams(&self, writes: Vec<StreamWrite>) -> Result<Vec<Version>>;

    /// Events of one stream with version `>= from_version`, oldest first.
    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Events across all streams that match `query`, in commit order.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>>;

    /// Every stored event, in commit order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Current head of a stream, or `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;

    /// Stores a snapshot, replacing any previous one for the same stream.
    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()>;

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>>;

    /// Appends events to a single stream.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let aggregate_id = events
            .first()
            .map(|e| e.aggregate_id)
            .ok_or_else(|| EventStoreError::InvalidAppend("no events to append".into()))?;

        let versions = self
            .append_streams(vec![StreamWrite::new(aggregate_id, events, options)])
            .await?;

        versions
            .into_iter()
            .next()
            .ok_or_else(|| EventStoreError::InvalidAppend("store returned no stream head".into()))
    }
}

/// Convenience reads built on [`EventStore`].
#[async_trait]
pub trait EventStoreExt: EventStore {
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        self.get_events_for_aggregate_from_version(aggregate_id, Version::first())
            .await
    }

    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }

    /// Loads a stream for replay: the latest snapshot (if any) and the events
    /// recorded after it.
    async fn load_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<(Option<Snapshot>, Vec<EventEnvelope>)> {
        match self.get_snapshot(aggregate_id).await? {
            Some(snapshot) => {
                let events = self
                    .get_events_for_aggregate_from_version(aggregate_id, snapshot.version.next())
                    .await?;
                Ok((Some(snapshot), events))
            }
            None => Ok((None, self.get_events_for_aggregate(aggregate_id).await?)),
        }
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks the shape of a batch before any store-specific work.
///
/// Every write must name a distinct stream, its events must belong to that
/// stream with consecutive versions, and at least one write must carry events.
pub fn validate_writes(writes: &[StreamWrite]) -> Result<()> {
    if writes.iter().all(|w| w.events.is_empty()) {
        return Err(EventStoreError::InvalidAppend("no events to append".into()));
    }

    let mut seen = HashSet::with_capacity(writes.len());
    for write in writes {
        if !seen.insert(write.aggregate_id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "stream {} appears more than once",
                write.aggregate_id
            )));
        }

        let Some(first) = write.events.first() else {
            continue;
        };

        if let Some(expected) = write.options.expected_version
            && first.version != expected.next()
        {
            return Err(EventStoreError::InvalidAppend(format!(
                "stream {} expects version {} but first event is {}",
                write.aggregate_id, expected, first.version
            )));
        }

        let mut version = first.version;
        for (i, event) in write.events.iter().enumerate() {
            if event.aggregate_id != write.aggregate_id {
                return Err(EventStoreError::InvalidAppend(format!(
                    "event for {} filed under stream {}",
                    event.aggregate_id, write.aggregate_id
                )));
            }
            if event.aggregate_type != first.aggregate_type {
                return Err(EventStoreError::InvalidAppend(format!(
                    "stream {} mixes aggregate types",
                    write.aggregate_id
                )));
            }
            if i > 0 {
                version = version.next();
                if event.version != version {
                    return Err(EventStoreError::InvalidAppend(format!(
                        "stream {} versions must be consecutive: expected {}, got {}",
                        write.aggregate_id, version, event.version
                    )));
                }
            }
        }
    }

    Ok(())
}
