//! Loads and persists [`EntityRoot`]s on top of a plain [`EventStore`],
//! mapping each entity to the stream named after its
//! [`aggregate_uuid`].
//!
//! Grounded on the original `AggregateStore.store`/`.load` and on the
//! teacher's `aggregate::repository::EventSourcedRepository`, whose
//! `get` folds replayed events through `Context::rehydrate_from` and
//! whose `store` appends the root's recorded events under the version
//! it was loaded at.

use std::marker::PhantomData;
use std::time::Duration;

use crate::entity::{aggregate_uuid, Entity, EntityRoot};
use crate::error::Error;
use crate::event_store::{EventStore, EventStoreExt, ReadInstruction};
use crate::types::StreamName;
use crate::version::ExpectedVersion;

/// Loads and stores entities of type `T` against an [`EventStore`] `S`.
pub struct AggregateStore<'s, T, S: ?Sized> {
    store: &'s S,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, T, S> AggregateStore<'s, T, S>
where
    T: Entity + Default,
    S: EventStore + ?Sized,
{
    /// Builds a store that loads and persists entities of type `T`
    /// against `store`.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Persists `root`'s uncommitted changes, if any, under
    /// [`crate::version::ExpectedVersion::Exact`] of the version it was
    /// loaded at. A no-op if there is nothing uncommitted.
    ///
    /// On success, marks the root's changes as committed so a
    /// subsequent `store` call only appends what changed since.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, root)))]
    pub async fn store(&self, root: &mut EntityRoot<T>) -> Result<(), AggregateStoreError> {
        if root.uncommitted_changes().is_empty() {
            return Ok(());
        }

        let stream = self.stream_for(root.entity().aggregate_id());
        let events = root.uncommitted_changes().to_vec();

        self.store
            .append(stream, ExpectedVersion::Exact(root.version()), events, None)
            .await?;

        root.mark_changes_as_committed();

        Ok(())
    }

    /// Constructs a fresh `T` and replays every event committed to the
    /// stream derived from `id`, in order, through [`Entity::when`].
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self)))]
    pub async fn load(&self, id: &str) -> Result<EntityRoot<T>, Error> {
        let stream = self.stream_for(id);
        let events = self
            .store
            .read_stream(stream, None, usize::MAX, None)
            .await?;

        let mut root = EntityRoot::new(T::default());

        for recorded in events {
            root.apply_rehydrated_event(recorded.event);
        }

        Ok(root)
    }

    /// Like [`AggregateStore::load`], but additionally enforces the
    /// supplied read `timeout`.
    pub async fn load_with_timeout(
        &self,
        id: &str,
        timeout: Option<Duration>,
    ) -> Result<EntityRoot<T>, Error> {
        let stream = self.stream_for(id);

        let mut instructions = std::collections::BTreeMap::new();
        instructions.insert(stream, ReadInstruction::all());

        let events = self
            .store
            .read_streams(instructions, false, usize::MAX, timeout)
            .await?;

        let mut root = EntityRoot::new(T::default());

        for recorded in events {
            root.apply_rehydrated_event(recorded.event);
        }

        Ok(root)
    }

    fn stream_for(&self, id: &str) -> StreamName {
        StreamName::new(aggregate_uuid(id).to_string())
    }
}

/// Error returned by [`AggregateStore::store`].
#[derive(Debug, thiserror::Error)]
pub enum AggregateStoreError {
    /// Another writer committed to the stream after this root was
    /// loaded; the caller must reload and retry at the domain level.
    #[error("aggregate was modified concurrently, reload and retry")]
    Conflict,

    /// Any other failure while appending, propagated unchanged.
    #[error(transparent)]
    Store(#[from] Error),
}

impl From<crate::event_store::AppendError> for AggregateStoreError {
    fn from(err: crate::event_store::AppendError) -> Self {
        match err {
            crate::event_store::AppendError::WrongExpectedVersion(_) => AggregateStoreError::Conflict,
            crate::event_store::AppendError::Store(err) => AggregateStoreError::Store(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cloud_event::CloudEvent;
    use crate::inmemory::InMemoryEventStore;

    #[derive(Debug, Default, PartialEq)]
    struct Counter {
        id: String,
        total: i64,
    }

    impl Entity for Counter {
        fn when(&mut self, event: &CloudEvent) {
            if event.ty() == "counter.incremented" {
                self.total += 1;
            }
        }

        fn aggregate_id(&self) -> &str {
            &self.id
        }
    }

    #[tokio::test]
    async fn store_then_load_round_trips_the_entity() {
        let event_store = InMemoryEventStore::new();
        let aggregates: AggregateStore<'_, Counter, _> = AggregateStore::new(&event_store);

        let mut root = aggregates.load("counter-1").await.unwrap();
        root.apply(CloudEvent::new("1", "urn:venty:test", "counter.incremented"));
        root.apply(CloudEvent::new("2", "urn:venty:test", "counter.incremented"));

        aggregates.store(&mut root).await.unwrap();
        assert!(root.uncommitted_changes().is_empty());

        let reloaded = aggregates.load("counter-1").await.unwrap();
        assert_eq!(reloaded.entity().total, 2);
        assert_eq!(reloaded.version(), 1);
    }

    #[tokio::test]
    async fn storing_with_no_uncommitted_changes_is_a_no_op() {
        let event_store = InMemoryEventStore::new();
        let aggregates: AggregateStore<'_, Counter, _> = AggregateStore::new(&event_store);

        let mut root = aggregates.load("counter-1").await.unwrap();
        aggregates.store(&mut root).await.unwrap();

        assert_eq!(event_store.commit_position().await, crate::types::NO_COMMIT_POSITION);
    }

    #[tokio::test]
    async fn a_concurrent_writer_causes_the_next_store_to_conflict() {
        let event_store = InMemoryEventStore::new();
        let aggregates: AggregateStore<'_, Counter, _> = AggregateStore::new(&event_store);

        let mut first = aggregates.load("counter-1").await.unwrap();
        first.apply(CloudEvent::new("1", "urn:venty:test", "counter.incremented"));

        let mut second = aggregates.load("counter-1").await.unwrap();
        second.apply(CloudEvent::new("2", "urn:venty:test", "counter.incremented"));

        aggregates.store(&mut first).await.unwrap();

        let result = aggregates.store(&mut second).await;
        assert!(matches!(result, Err(AggregateStoreError::Conflict)));
    }
}
