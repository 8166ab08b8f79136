//! A non-durable [`EventStore`] backed by an in-process `Mutex`.
//!
//! Grounded on the original `InMemoryEventStore` and on the teacher's
//! `eventually::event::store::InMemory`: both guard a single map from
//! stream name to its events behind one lock, so that an append and the
//! version check it depends on happen atomically with respect to every
//! other caller.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::cloud_event::CloudEvent;
use crate::error::Error;
use crate::event_store::{EventStore, ReadInstruction, RecordedEvent};
use crate::timing::collect_with_timeout;
use crate::types::{
    CommitPosition, CurrentVersion, StreamName, StreamVersion, NO_COMMIT_POSITION,
};
use crate::version::{is_version_correct, ExpectedVersion};

struct State {
    streams: HashMap<StreamName, Vec<RecordedEvent>>,
    last_commit_position: CommitPosition,
}

impl Default for State {
    fn default() -> Self {
        Self {
            streams: HashMap::new(),
            last_commit_position: NO_COMMIT_POSITION,
        }
    }
}

impl State {
    fn stream_version(&self, stream: &StreamName) -> CurrentVersion {
        self.streams
            .get(stream)
            .and_then(|events| events.last())
            .map_or(CurrentVersion::NoStream, |event| {
                CurrentVersion::Current(event.stream_position)
            })
    }

    fn commit_position(&self) -> CommitPosition {
        self.last_commit_position
    }
}

/// An [`EventStore`] that keeps every stream in memory for the lifetime
/// of the process.
///
/// Useful for tests and for single-process deployments that don't need
/// durability. Cloning is cheap and shares the same backing store: wrap
/// in an [`std::sync::Arc`] to hand multiple owners a handle to it.
#[derive(Default)]
pub struct InMemoryEventStore {
    state: Mutex<State>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip(self, events), fields(stream = %stream))
    )]
    async fn attempt_append(
        &self,
        stream: StreamName,
        expected_version: ExpectedVersion,
        events: Vec<CloudEvent>,
        timeout: Option<Duration>,
    ) -> Result<Option<CommitPosition>, Error> {
        let events = collect_with_timeout(events, timeout)?;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if !is_version_correct(expected_version, || state.stream_version(&stream)) {
            return Ok(None);
        }

        if events.is_empty() {
            return Ok(Some(state.commit_position()));
        }

        let mut next_stream_position: StreamVersion = match state.stream_version(&stream) {
            CurrentVersion::NoStream => 0,
            CurrentVersion::Current(v) => v + 1,
        };

        let mut commit_position = state.last_commit_position;
        let recorded = state.streams.entry(stream.clone()).or_default();

        for event in events {
            commit_position += 1;

            recorded.push(RecordedEvent {
                event,
                stream_name: stream.clone(),
                stream_position: next_stream_position,
                commit_position,
            });

            next_stream_position += 1;
        }

        state.last_commit_position = commit_position;

        Ok(Some(state.last_commit_position))
    }

    async fn read_streams(
        &self,
        instructions: BTreeMap<StreamName, ReadInstruction>,
        backwards: bool,
        limit: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<RecordedEvent>, Error> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let per_stream = instructions.into_iter().map(|(stream, instruction)| {
            let Some(events) = state.streams.get(&stream) else {
                return Vec::new();
            };

            let start = instruction.stream_position.unwrap_or(0).max(0) as usize;
            let mut slice: Vec<_> = events
                .iter()
                .filter(|event| event.stream_position as usize >= start)
                .take(instruction.limit)
                .cloned()
                .collect();

            if backwards {
                slice.reverse();
            }

            slice
        });

        let mut out = collect_with_timeout(per_stream, timeout)?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        out.truncate(limit);

        Ok(out)
    }

    async fn commit_position(&self) -> CommitPosition {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).commit_position()
    }

    async fn current_version(
        &self,
        stream: &StreamName,
        _timeout: Option<Duration>,
    ) -> Result<CurrentVersion, Error> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.stream_version(stream))
    }
}
