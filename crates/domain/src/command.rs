//! Loading aggregates and recording the events their commands produce.

use std::collections::HashMap;
use std::marker::PhantomData;

use common::AggregateId;
use event_store::{
    AppendOptions, EventEnvelope, EventQuery, EventStore, EventStoreExt, Snapshot, StreamWrite,
    Version,
};
use serde::de::DeserializeOwned;

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;

/// Outcome of a command that ran against a single aggregate.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// State after the new events.
    pub aggregate: A,
    /// Events recorded by the command; empty when it was a no-op.
    pub events: Vec<A::Event>,
    pub new_version: Version,
}

/// Loads aggregates of one type from an event store and persists the events
/// their commands emit, with optimistic concurrency on the stream version.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an aggregate from its snapshot (if any) and later events.
    ///
    /// A stream with no events yields `A::default()`.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = match snapshot {
            Some(snapshot) => snapshot.into_state::<A>()?,
            None => A::default(),
        };

        for envelope in events {
            aggregate.apply(envelope.decode()?);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Like [`load`](Self::load), but `None` when the stream was never created.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Replays every stream of this aggregate type, in order of creation.
    pub async fn load_all(&self) -> Result<Vec<A>, DomainError> {
        let envelopes = self
            .store
            .query_events(EventQuery::for_aggregate_type(A::aggregate_type()))
            .await?;

        let mut created = Vec::new();
        let mut states: HashMap<AggregateId, A> = HashMap::new();
        for envelope in envelopes {
            let id = envelope.aggregate_id;
            let aggregate = states.entry(id).or_insert_with(|| {
                created.push(id);
                A::default()
            });
            aggregate.apply(envelope.decode()?);
            aggregate.set_version(envelope.version);
        }

        Ok(created
            .into_iter()
            .filter_map(|id| states.remove(&id))
            .filter(|a| a.id().is_some())
            .collect())
    }

    /// Runs `command_fn` against the current state and appends its events.
    ///
    /// Fails with a concurrency conflict if another writer appended to the
    /// stream between the load and the append.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let aggregate = self.load(aggregate_id).await?;
        let events = command_fn(&aggregate)?;
        self.record(aggregate_id, aggregate, events).await
    }

    async fn record(
        &self,
        aggregate_id: AggregateId,
        mut aggregate: A,
        events: Vec<A::Event>,
    ) -> Result<CommandResult<A>, DomainError> {
        let current_version = aggregate.version();
        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events,
                new_version: current_version,
            });
        }

        let envelopes = build_envelopes::<A>(aggregate_id, current_version, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(current_version))
            .await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
{
    /// [`execute`](Self::execute), then snapshot when the new version lands
    /// on the aggregate's snapshot interval.
    pub async fn execute_with_snapshot<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self.execute(aggregate_id, command_fn).await?;
        self.snapshot_if_due(aggregate_id, &result.aggregate).await?;
        Ok(result)
    }

    /// Saves a snapshot if `aggregate` sits on a snapshot boundary.
    pub async fn snapshot_if_due(
        &self,
        aggregate_id: AggregateId,
        aggregate: &A,
    ) -> Result<(), DomainError> {
        if aggregate.should_snapshot() {
            let snapshot = Snapshot::from_state(
                aggregate_id,
                A::aggregate_type(),
                aggregate.version(),
                aggregate,
            )?;
            self.store.save_snapshot(snapshot).await?;
        }
        Ok(())
    }
}

/// Wraps events for `aggregate_id`, numbering them after `current_version`.
pub fn build_envelopes<A: Aggregate>(
    aggregate_id: AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<Vec<EventEnvelope>, DomainError> {
    let mut version = current_version;
    events
        .iter()
        .map(|event| -> Result<EventEnvelope, DomainError> {
            version = version.next();
            Ok(EventEnvelope::builder()
                .aggregate_id(aggregate_id)
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()?)
        })
        .collect()
}

/// Prepares one stream's part of a multi-stream commit.
///
/// The write only commits if the stream is still at `current_version`.
pub fn stage<A: Aggregate>(
    aggregate_id: AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<StreamWrite, DomainError> {
    Ok(StreamWrite::new(
        aggregate_id,
        build_envelopes::<A>(aggregate_id, current_version, events)?,
        AppendOptions::expect_version(current_version),
    ))
}
