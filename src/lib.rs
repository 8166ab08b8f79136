//! Building blocks for event-sourced systems built on the CloudEvents
//! data model: an append-only [`EventStore`] with per-stream optimistic
//! concurrency, an [`AggregateStore`] that replays [`Entity`]s from
//! their history, and thin [`Channel`] sinks for publishing events
//! alongside persisting them.

pub mod aggregate_store;
pub mod channel;
pub mod cloud_event;
pub mod entity;
pub mod error;
pub mod event_store;
pub mod inmemory;
pub mod producer;
pub mod producer_stack;
pub mod timing;
pub mod types;
pub mod version;

pub use aggregate_store::{AggregateStore, AggregateStoreError};
pub use channel::{BestEffort, Channel, ChannelExt, EventStreamChannel, InMemoryChannel, NullChannel};
#[cfg(feature = "http")]
pub use channel::{HttpChannel, HttpChannelMode};
pub use cloud_event::CloudEvent;
pub use entity::{aggregate_uuid, Entity, EntityRoot};
pub use error::Error;
pub use event_store::{AppendError, EventStore, EventStoreExt, ReadInstruction, RecordedEvent};
pub use inmemory::InMemoryEventStore;
pub use producer::{Producer, SimpleProducer};
pub use producer_stack::ProducerStack;
pub use types::{
    CommitPosition, CurrentVersion, StreamName, StreamState, StreamVersion, NO_COMMIT_POSITION,
    NO_EVENT_VERSION,
};
pub use version::{is_version_correct, ExpectedVersion};
