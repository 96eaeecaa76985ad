use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventQuery, EventStoreError, Result, Snapshot, Version,
    store::{EventStore, EventStream, StreamWrite, validate_writes},
};

const EVENT_COLUMNS: &str =
    "id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata";

/// PostgreSQL-backed event store.
///
/// Events live in one `events` table ordered by a global `sequence` column;
/// `(aggregate_id, version)` is unique, which is what turns two racing
/// writers into a [`EventStoreError::ConcurrencyConflict`].
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata: HashMap<String, serde_json::Value> =
            serde_json::from_value(row.try_get("metadata")?)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }

    async fn stream_head(
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: AggregateId,
    ) -> Result<Version> {
        let head: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&mut **tx)
                .await?;
        Ok(Version::new(head.unwrap_or(0)))
    }

    async fn insert_event(
        tx: &mut Transaction<'_, Postgres>,
        event: &EventEnvelope,
        expected: Version,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.event_id.as_uuid())
        .bind(&event.event_type)
        .bind(event.aggregate_id.as_uuid())
        .bind(&event.aggregate_type)
        .bind(event.version.as_i64())
        .bind(event.timestamp)
        .bind(&event.payload)
        .bind(serde_json::to_value(&event.metadata)?)
        .execute(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some("unique_aggregate_version") =>
            {
                metrics::counter!("event_store_conflicts_total").increment(1);
                EventStoreError::ConcurrencyConflict {
                    aggregate_id: event.aggregate_id,
                    expected,
                    actual: event.version,
                }
            }
            other => EventStoreError::Database(other),
        })?;
        Ok(())
    }
}

/// Advisory lock key for a stream. Collisions only cost extra serialization.
fn lock_key(aggregate_id: AggregateId) -> i64 {
    aggregate_id.as_uuid().as_u64_pair().0 as i64
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append_streams(&self, writes: Vec<StreamWrite>) -> Result<Vec<Version>> {
        validate_writes(&writes)?;

        let mut tx = self.pool.begin().await?;

        // Lock every touched stream in a fixed order so that assertions on
        // streams we do not write still serialize with their writers.
        let mut keys: Vec<i64> = writes.iter().map(|w| lock_key(w.aggregate_id)).collect();
        keys.sort_unstable();
        keys.dedup();
        for key in keys {
            sqlx::query("SELECT pg_advisory_xact_lock($1)")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        let mut heads = Vec::with_capacity(writes.len());
        for write in &writes {
            let actual = Self::stream_head(&mut tx, write.aggregate_id).await?;
            let expected = match (write.options.expected_version, write.events.first()) {
                (Some(expected), _) => expected,
                (None, Some(first)) => Version::new(first.version.as_i64() - 1),
                (None, None) => actual,
            };
            if actual != expected {
                metrics::counter!("event_store_conflicts_total").increment(1);
                tracing::debug!(aggregate_id = %write.aggregate_id, %expected, %actual, "stream moved");
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id: write.aggregate_id,
                    expected,
                    actual,
                });
            }

            for event in &write.events {
                Self::insert_event(&mut tx, event, expected).await?;
            }
            heads.push(write.events.last().map(|e| e.version).unwrap_or(actual));
        }

        tx.commit().await?;
        Ok(heads)
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE aggregate_id = $1 AND version >= $2 ORDER BY version ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(aggregate_id.as_uuid())
            .bind(from_version.as_i64())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE 1=1");
        let mut param = 0;
        let mut next_param = || {
            param += 1;
            param
        };

        if query.aggregate_type.is_some() {
            sql.push_str(&format!(" AND aggregate_type = ${}", next_param()));
        }
        if query.event_types.is_some() {
            sql.push_str(&format!(" AND event_type = ANY(${})", next_param()));
        }
        if query.from_timestamp.is_some() {
            sql.push_str(&format!(" AND timestamp >= ${}", next_param()));
        }
        if query.to_timestamp.is_some() {
            sql.push_str(&format!(" AND timestamp <= ${}", next_param()));
        }
        sql.push_str(" ORDER BY sequence ASC");
        if query.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${}", next_param()));
        }

        let mut statement = sqlx::query(&sql);
        if let Some(aggregate_type) = query.aggregate_type {
            statement = statement.bind(aggregate_type);
        }
        if let Some(event_types) = query.event_types {
            statement = statement.bind(event_types);
        }
        if let Some(from) = query.from_timestamp {
            statement = statement.bind(from);
        }
        if let Some(to) = query.to_timestamp {
            statement = statement.bind(to);
        }
        if let Some(limit) = query.limit {
            statement = statement.bind(limit as i64);
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        // The boxed stream must not borrow the pool, so rows are fetched up front.
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY sequence ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(Box::pin(futures_util::stream::iter(
            rows.into_iter().map(Self::row_to_event),
        )))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (aggregate_id, aggregate_type, version, timestamp, state)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (aggregate_id) DO UPDATE SET
                aggregate_type = EXCLUDED.aggregate_type,
                version = EXCLUDED.version,
                timestamp = EXCLUDED.timestamp,
                state = EXCLUDED.state
            "#,
        )
        .bind(snapshot.aggregate_id.as_uuid())
        .bind(&snapshot.aggregate_type)
        .bind(snapshot.version.as_i64())
        .bind(snapshot.timestamp)
        .bind(&snapshot.state)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: AggregateId) -> Result<Option<Snapshot>> {
        let row = sqlx::query(
            "SELECT aggregate_id, aggregate_type, version, timestamp, state FROM snapshots WHERE aggregate_id = $1",
        )
        .bind(aggregate_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Snapshot> {
            Ok(Snapshot {
                aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                version: Version::new(row.try_get("version")?),
                timestamp: row.try_get("timestamp")?,
                state: row.try_get("state")?,
            })
        })
        .transpose()
    }
}
