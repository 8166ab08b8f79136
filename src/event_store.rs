//! The [`EventStore`] contract: an append-only log sharded into named
//! streams, with per-stream optimistic concurrency and a store-wide
//! commit position.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::cloud_event::CloudEvent;
use crate::error::{Error, WrongExpectedVersion};
use crate::types::{CommitPosition, CurrentVersion, StreamName, StreamVersion};
use crate::version::ExpectedVersion;

/// Selects a slice of a single stream to read.
///
/// `stream_position` of `None` means "from the beginning" when reading
/// forward, or "from the end" when reading backward;
/// [`crate::NO_EVENT_VERSION`] is equivalent to `None` in forward mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadInstruction {
    /// The stream position to start reading from (inclusive).
    pub stream_position: Option<StreamVersion>,
    /// The maximum number of events to read from this stream.
    pub limit: usize,
}

impl ReadInstruction {
    /// Reads every event currently in the stream.
    pub fn all() -> Self {
        Self {
            stream_position: None,
            limit: usize::MAX,
        }
    }

    /// Reads up to `limit` events starting at `stream_position`.
    pub fn from(stream_position: StreamVersion, limit: usize) -> Self {
        Self {
            stream_position: Some(stream_position),
            limit,
        }
    }
}

impl Default for ReadInstruction {
    fn default() -> Self {
        Self::all()
    }
}

/// An event as returned by a read, carrying the positional metadata
/// assigned to it when it was committed.
///
/// Immutable once emitted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// The event as originally appended.
    pub event: CloudEvent,
    /// The stream this event belongs to.
    pub stream_name: StreamName,
    /// The 0-based position of this event within `stream_name`.
    pub stream_position: StreamVersion,
    /// The store-wide commit position assigned to this event.
    pub commit_position: CommitPosition,
}

/// An append-only, ordered log of [`CloudEvent`]s sharded into named
/// streams, with per-stream optimistic concurrency control and a
/// monotonically increasing global commit position.
///
/// Implementations are shared by callers running on parallel threads of
/// execution (see `spec.md` §5): methods take `&self`, not `&mut self`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Attempts to append `events` to `stream`, returning the highest
    /// commit position assigned on success, or `None` if `expected_version`
    /// does not match the stream's actual version.
    ///
    /// `events` is consumed eagerly; if `timeout` is set and consumption
    /// exceeds it, the call fails with [`Error::Timeout`] and commits
    /// nothing. An empty `events` sequence is a no-op that returns the
    /// store's current highest commit position without writing.
    async fn attempt_append(
        &self,
        stream: StreamName,
        expected_version: ExpectedVersion,
        events: Vec<CloudEvent>,
        timeout: Option<Duration>,
    ) -> Result<Option<CommitPosition>, Error>;

    /// Reads events from one or more streams.
    ///
    /// For each named stream, yields events whose `stream_position` lies
    /// in the inclusive range `[start, start + instruction.limit]`, where
    /// `start` is the instruction's `stream_position` (or `0` in forward
    /// mode when unset). `backwards` reverses per-stream ordering. The
    /// overall `limit` caps the total number of events returned across
    /// all streams. Cross-stream ordering is unspecified: this
    /// implementation concatenates streams in the iteration order of
    /// `instructions`.
    async fn read_streams(
        &self,
        instructions: BTreeMap<StreamName, ReadInstruction>,
        backwards: bool,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<RecordedEvent>, Error>;

    /// Returns the highest commit position ever assigned, or
    /// [`crate::NO_COMMIT_POSITION`] for an empty store.
    async fn commit_position(&self) -> CommitPosition;

    /// Returns the current version of `stream`, or
    /// [`CurrentVersion::NoStream`] if it has never been appended to.
    async fn current_version(
        &self,
        stream: &StreamName,
        timeout: Option<Duration>,
    ) -> Result<CurrentVersion, Error>;
}

/// Extension trait with the non-optional, convenience variants of
/// [`EventStore`]'s operations.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Like [`EventStore::attempt_append`], but returns
    /// [`WrongExpectedVersion`] instead of `None` on a version mismatch.
    async fn append(
        &self,
        stream: StreamName,
        expected_version: ExpectedVersion,
        events: Vec<CloudEvent>,
        timeout: Option<Duration>,
    ) -> Result<CommitPosition, AppendError> {
        self.attempt_append(stream, expected_version, events, timeout)
            .await?
            .ok_or(AppendError::WrongExpectedVersion(WrongExpectedVersion))
    }

    /// Reads a single stream from `stream_position` (or the beginning, if
    /// `None`) forward, up to `limit` events.
    async fn read_stream(
        &self,
        stream: StreamName,
        stream_position: Option<StreamVersion>,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<RecordedEvent>, Error> {
        let mut instructions = BTreeMap::new();
        instructions.insert(stream, ReadInstruction { stream_position, limit });

        self.read_streams(instructions, false, limit, timeout).await
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Error returned by [`EventStoreExt::append`].
#[derive(Debug, thiserror::Error)]
pub enum AppendError {
    /// The expected version did not match the stream's actual version.
    #[error(transparent)]
    WrongExpectedVersion(#[from] WrongExpectedVersion),
    /// Any other failure while appending, propagated unchanged.
    #[error(transparent)]
    Store(#[from] Error),
}
