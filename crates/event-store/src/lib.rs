//! Event storage for the storefront back-office.
//!
//! Every aggregate is an append-only stream of events guarded by a version
//! number. Writers state the version they read; if another writer got there
//! first the append fails with [`EventStoreError::ConcurrencyConflict`] and the
//! caller reloads and retries. [`EventStore::append_streams`] extends that
//! guarantee across several streams, which is how an order, the stock of each
//! product it consumes and the buyer's identity records commit together.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::EventQuery;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream, StreamWrite};
