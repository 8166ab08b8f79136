//! An [`venty::EventStore`] implementation using PostgreSQL as a
//! backend data store.
//!
//! Grounded on the teacher's `eventually-postgres::store`: a `bb8`
//! connection pool wraps `tokio_postgres`, migrations run once through
//! `refinery` ahead of any query, and every operation checks out a
//! connection from the pool rather than holding one for the store's
//! lifetime.

use std::collections::BTreeMap;
use std::ops::DerefMut;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, RunError};
use bb8_postgres::PostgresConnectionManager;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};
use tokio_postgres::{IsolationLevel, Socket};
use uuid::Uuid;

use venty::cloud_event::CloudEvent;
use venty::error::Error as VentyError;
use venty::event_store::{EventStore as EventStoreTrait, ReadInstruction, RecordedEvent};
use venty::types::{CommitPosition, CurrentVersion, StreamName, StreamVersion, NO_EVENT_VERSION};
use venty::version::{is_version_correct, ExpectedVersion};

use crate::config::Config;

const AGGREGATE_NAMESPACE: Uuid = Uuid::from_bytes([
    0xc3, 0x56, 0x9d, 0x87, 0xe0, 0x91, 0x47, 0x57, 0x92, 0xe6, 0xe2, 0xda, 0x40, 0xe0, 0x01, 0x29,
]);

fn stream_id(stream: &StreamName) -> Uuid {
    Uuid::new_v5(&AGGREGATE_NAMESPACE, stream.as_str().as_bytes())
}

/// Error returned by [`EventStore`]'s operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to encode an event to JSON before writing it.
    #[error("failed to encode event as json: {0}")]
    EncodeEvent(#[source] serde_json::Error),

    /// Failed to decode a row's event column back into a [`CloudEvent`].
    #[error("failed to decode event from the database: {0}")]
    DecodeEvent(#[source] serde_json::Error),

    /// Error returned by the Postgres client.
    #[error("postgres client returned an error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Error returned by the `bb8` connection pool.
    #[error("bb8 connection pool returned an error: {0}")]
    Bb8(#[from] RunError<tokio_postgres::Error>),

    /// The configured table name is not a valid SQL identifier.
    #[error(transparent)]
    InvalidTableName(#[from] crate::config::InvalidTableName),

    /// Failed to run the embedded schema migrations.
    #[error("failed to run migrations: {0}")]
    Migration(#[source] anyhow::Error),
}

impl From<Error> for VentyError {
    fn from(err: Error) -> Self {
        VentyError::backend(err)
    }
}

/// Builds [`EventStore`] instances, ensuring the schema is migrated
/// before any query runs against it.
pub struct EventStoreBuilder;

impl EventStoreBuilder {
    /// Runs the embedded migrations against `pool`, rendering the table
    /// name from `config` into the migration SQL, then returns a ready
    /// [`EventStore`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(pool), err)
    )]
    pub async fn build<Tls>(
        pool: Pool<PostgresConnectionManager<Tls>>,
        config: Config,
    ) -> Result<EventStore<Tls>, Error>
    where
        Tls: MakeTlsConnect<Socket> + Clone + Send + Sync + 'static,
        <Tls as MakeTlsConnect<Socket>>::Stream: Send + Sync,
        <Tls as MakeTlsConnect<Socket>>::TlsConnect: Send,
        <<Tls as MakeTlsConnect<Socket>>::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        config.validate()?;

        let mut connection = pool.get().await?;

        let rendered = include_str!("migrations/V1__recorded_events.sql")
            .replace("{table}", &config.recorded_events_table_name);

        let migration = refinery::Migration::unapplied("V1__recorded_events", &rendered)
            .map_err(|err| Error::Migration(err.into()))?;

        refinery::Runner::new(&[migration])
            .run_async(connection.deref_mut())
            .await
            .map_err(|err| Error::Migration(err.into()))?;

        drop(connection);

        Ok(EventStore {
            pool,
            table_name: config.recorded_events_table_name,
        })
    }
}

/// [`venty::EventStore`] implementation backed by PostgreSQL.
///
/// Deliberately does not support the `timeout` parameter of
/// [`venty::EventStore::attempt_append`]/`read_streams`: the backend
/// already bounds each query through the pool's own connection timeout,
/// and adding a second, independent deadline would race the
/// transaction in ways the caller can't observe. Passing `Some(_)` is a
/// programming error.
pub struct EventStore<Tls>
where
    Tls: MakeTlsConnect<Socket> + Clone + Send + Sync + 'static,
    <Tls as MakeTlsConnect<Socket>>::Stream: Send + Sync,
    <Tls as MakeTlsConnect<Socket>>::TlsConnect: Send,
    <<Tls as MakeTlsConnect<Socket>>::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    pool: Pool<PostgresConnectionManager<Tls>>,
    table_name: String,
}

impl<Tls> EventStore<Tls>
where
    Tls: MakeTlsConnect<Socket> + Clone + Send + Sync + 'static,
    <Tls as MakeTlsConnect<Socket>>::Stream: Send + Sync,
    <Tls as MakeTlsConnect<Socket>>::TlsConnect: Send,
    <<Tls as MakeTlsConnect<Socket>>::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    async fn stream_metadata(
        &self,
        client: &tokio_postgres::Transaction<'_>,
        id: Uuid,
    ) -> Result<CurrentVersion, Error> {
        let query = format!(
            "select max(stream_position) as position from {} where stream_id = $1",
            self.table_name
        );

        let row = client.query_one(&query, &[&id]).await?;
        let position: Option<i64> = row.try_get("position")?;

        Ok(match position {
            Some(position) => CurrentVersion::Current(position),
            None => CurrentVersion::NoStream,
        })
    }

    /// Implements the append algorithm of `spec.md` §4.4: open a
    /// serializable transaction, re-check the expected version against
    /// fresh metadata, insert the new rows, and retry from scratch on a
    /// uniqueness violation rather than reusing the positions computed
    /// before the conflict.
    async fn attempt_append_once(
        &self,
        stream: &StreamName,
        expected_version: ExpectedVersion,
        events: &[CloudEvent],
    ) -> Result<Option<CommitPosition>, Error> {
        let mut client = self.pool.get().await?;
        let transaction = client
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await?;

        let id = stream_id(stream);
        let current_version = self.stream_metadata(&transaction, id).await?;

        if !is_version_correct(expected_version, || current_version) {
            transaction.rollback().await?;
            return Ok(None);
        }

        if events.is_empty() {
            let position = self.highest_commit_position(&transaction).await?;
            transaction.rollback().await?;
            return Ok(Some(position));
        }

        let mut next_position: StreamVersion = match current_version {
            CurrentVersion::NoStream => 0,
            CurrentVersion::Current(v) => v + 1,
        };

        let insert = format!(
            "insert into {} (stream_id, stream_position, event) values ($1, $2, $3) returning id",
            self.table_name
        );

        let mut highest = None;

        for event in events {
            let payload = serde_json::to_value(event).map_err(Error::EncodeEvent)?;

            let row = match transaction.query_one(&insert, &[&id, &next_position, &payload]).await {
                Ok(row) => row,
                Err(err) if is_unique_violation(&err) => {
                    transaction.rollback().await?;
                    return self.attempt_append_retry(stream, expected_version, events).await;
                }
                Err(err) => return Err(err.into()),
            };

            let commit_position: i64 = row.try_get("id")?;
            highest = Some(commit_position);
            next_position += 1;
        }

        transaction.commit().await?;

        Ok(highest)
    }

    /// Boxed indirection so the retry path above can recurse through an
    /// `async fn` without an infinitely-sized future.
    fn attempt_append_retry<'a>(
        &'a self,
        stream: &'a StreamName,
        expected_version: ExpectedVersion,
        events: &'a [CloudEvent],
    ) -> futures::future::BoxFuture<'a, Result<Option<CommitPosition>, Error>> {
        Box::pin(self.attempt_append_once(stream, expected_version, events))
    }

    async fn highest_commit_position(
        &self,
        client: &tokio_postgres::Transaction<'_>,
    ) -> Result<CommitPosition, Error> {
        let query = format!("select max(id) as position from {}", self.table_name);
        let row = client.query_one(&query, &[]).await?;
        let position: Option<i64> = row.try_get("position")?;
        Ok(position.unwrap_or(venty::types::NO_COMMIT_POSITION))
    }
}

fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&tokio_postgres::error::SqlState::UNIQUE_VIOLATION)
}

#[async_trait]
impl<Tls> EventStoreTrait for EventStore<Tls>
where
    Tls: MakeTlsConnect<Socket> + Clone + Send + Sync + 'static,
    <Tls as MakeTlsConnect<Socket>>::Stream: Send + Sync,
    <Tls as MakeTlsConnect<Socket>>::TlsConnect: Send,
    <<Tls as MakeTlsConnect<Socket>>::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, events), fields(stream = %stream), err)
    )]
    async fn attempt_append(
        &self,
        stream: StreamName,
        expected_version: ExpectedVersion,
        events: Vec<CloudEvent>,
        timeout: Option<Duration>,
    ) -> Result<Option<CommitPosition>, VentyError> {
        assert!(
            timeout.is_none(),
            "venty-postgres does not support the timeout parameter"
        );

        self.attempt_append_once(&stream, expected_version, &events)
            .await
            .map_err(VentyError::from)
    }

    async fn read_streams(
        &self,
        instructions: BTreeMap<StreamName, ReadInstruction>,
        backwards: bool,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<RecordedEvent>, VentyError> {
        assert!(
            timeout.is_none(),
            "venty-postgres does not support the timeout parameter"
        );

        let client = self.pool.get().await.map_err(Error::from)?;

        let order = if backwards { "desc" } else { "asc" };
        let mut out = Vec::new();

        for (stream, instruction) in instructions {
            let id = stream_id(&stream);
            let start = instruction.stream_position.unwrap_or(0).max(0);
            let end = start.saturating_add(instruction.limit as i64);

            let query = format!(
                "select id, stream_position, event from {} \
                 where stream_id = $1 and stream_position >= $2 and stream_position < $3 \
                 order by stream_position {order}",
                self.table_name
            );

            let rows = client
                .query(&query, &[&id, &start, &end])
                .await
                .map_err(Error::from)?;

            for row in rows {
                let commit_position: i64 = row.try_get("id").map_err(Error::from)?;
                let stream_position: i64 = row.try_get("stream_position").map_err(Error::from)?;
                let payload: serde_json::Value = row.try_get("event").map_err(Error::from)?;

                let event: CloudEvent =
                    serde_json::from_value(payload).map_err(Error::DecodeEvent)?;

                out.push(RecordedEvent {
                    event,
                    stream_name: stream.clone(),
                    stream_position,
                    commit_position,
                });
            }
        }

        out.truncate(limit);

        Ok(out)
    }

    async fn commit_position(&self) -> CommitPosition {
        let Ok(client) = self.pool.get().await else {
            return venty::types::NO_COMMIT_POSITION;
        };

        let query = format!("select max(id) as position from {}", self.table_name);

        let Ok(row) = client.query_one(&query, &[]).await else {
            return venty::types::NO_COMMIT_POSITION;
        };

        row.try_get::<_, Option<i64>>("position")
            .ok()
            .flatten()
            .unwrap_or(venty::types::NO_COMMIT_POSITION)
    }

    async fn current_version(
        &self,
        stream: &StreamName,
        timeout: Option<Duration>,
    ) -> Result<CurrentVersion, VentyError> {
        assert!(
            timeout.is_none(),
            "venty-postgres does not support the timeout parameter"
        );

        let client = self.pool.get().await.map_err(Error::from)?;
        let query = format!(
            "select max(stream_position) as position from {} where stream_id = $1",
            self.table_name
        );

        let row = client
            .query_one(&query, &[&stream_id(stream)])
            .await
            .map_err(Error::from)?;

        let position: Option<i64> = row.try_get("position").map_err(Error::from)?;

        Ok(match position {
            Some(p) if p == NO_EVENT_VERSION => CurrentVersion::Current(NO_EVENT_VERSION),
            Some(p) => CurrentVersion::Current(p),
            None => CurrentVersion::NoStream,
        })
    }
}
