//! The `Entity` / aggregate root pattern: a domain object whose state is
//! derived entirely by replaying its own history of [`CloudEvent`]s.
//!
//! Grounded on the original `AggregateRoot`/`Entity` base classes and on
//! the teacher's `aggregate::root::{Context, Root}` split: a value that
//! tracks its own `version` and queue of `uncommitted_changes`, and a
//! single `when` method driving state transitions from events.

use uuid::Uuid;

use crate::cloud_event::CloudEvent;
use crate::error::MissingSubject;
use crate::types::{StreamVersion, NO_EVENT_VERSION};

/// A domain object whose state is derived by replaying a sequence of
/// [`CloudEvent`]s applied through [`Entity::when`].
///
/// Implementors carry their own `version` and `uncommitted_changes`
/// bookkeeping; [`EntityRoot`] provides the default, spec-compliant
/// bookkeeping so most implementations only need to implement `when`
/// and `aggregate_id`.
pub trait Entity {
    /// Mutates `self` in response to `event`.
    ///
    /// Called once per event during replay, in stream order, and once
    /// per event recorded through [`EntityRoot::apply`].
    fn when(&mut self, event: &CloudEvent);

    /// The entity's identity, used to derive the stream it is persisted
    /// to (see [`aggregate_uuid`]).
    fn aggregate_id(&self) -> &str;
}

/// A stable UUIDv5 namespace used to derive stream identities from
/// aggregate ids, so the core never needs a separate stream table.
pub const AGGREGATE_NAMESPACE: Uuid = Uuid::from_bytes([
    0xc3, 0x56, 0x9d, 0x87, 0xe0, 0x91, 0x47, 0x57, 0x92, 0xe6, 0xe2, 0xda, 0x40, 0xe0, 0x01, 0x29,
]);

/// Derives the stable stream identity for an entity with id `aggregate_id`.
pub fn aggregate_uuid(aggregate_id: &str) -> Uuid {
    Uuid::new_v5(&AGGREGATE_NAMESPACE, aggregate_id.as_bytes())
}

/// Wraps a user-defined [`Entity`] with the replay and change-tracking
/// bookkeeping `spec.md` §3 requires: `version`, defaulted to
/// [`NO_EVENT_VERSION`], and an ordered queue of `uncommitted_changes`.
///
/// Mirrors the teacher's `aggregate::root::Context<T>`, generalized to
/// the replay-only entity shape this crate uses in place of a
/// command-handling aggregate root.
#[derive(Debug, Clone)]
pub struct EntityRoot<T> {
    entity: T,
    version: StreamVersion,
    uncommitted_changes: Vec<CloudEvent>,
}

impl<T: Entity> EntityRoot<T> {
    /// Wraps a freshly constructed `entity` with no history: `version`
    /// starts at [`NO_EVENT_VERSION`] and there are no uncommitted
    /// changes.
    pub fn new(entity: T) -> Self {
        Self {
            entity,
            version: NO_EVENT_VERSION,
            uncommitted_changes: Vec::new(),
        }
    }

    /// Applies `event` as part of replaying history: mutates the entity
    /// through [`Entity::when`] and advances `version`, but does not
    /// enqueue the event as an uncommitted change.
    pub fn apply_rehydrated_event(&mut self, event: CloudEvent) {
        self.entity.when(&event);
        self.version += 1;
    }

    /// Records a new domain event: applies it immediately through
    /// [`Entity::when`] and enqueues it for the next
    /// [`crate::AggregateStore::store`] call.
    pub fn apply(&mut self, event: CloudEvent) {
        self.entity.when(&event);
        self.uncommitted_changes.push(event);
    }

    /// The version implied by the events replayed so far, not counting
    /// events not yet committed.
    #[inline]
    pub fn version(&self) -> StreamVersion {
        self.version
    }

    /// The events recorded since the last [`EntityRoot::mark_changes_as_committed`].
    #[inline]
    pub fn uncommitted_changes(&self) -> &[CloudEvent] {
        &self.uncommitted_changes
    }

    /// Clears the uncommitted changes queue and advances `version` by
    /// the number of events it held, called by
    /// [`crate::AggregateStore::store`] after a successful append.
    pub fn mark_changes_as_committed(&mut self) {
        self.version += self.uncommitted_changes.len() as StreamVersion;
        self.uncommitted_changes.clear();
    }

    /// Borrows the wrapped entity.
    #[inline]
    pub fn entity(&self) -> &T {
        &self.entity
    }

    /// Consumes the root, returning the wrapped entity.
    pub fn into_entity(self) -> T {
        self.entity
    }
}

/// Returns `event`'s `subject` attribute, or [`MissingSubject`] if it
/// carries none.
///
/// Used by aggregate command handlers that derive their target id from
/// an inbound event rather than from an explicit argument.
pub fn subject_aggregate(event: &CloudEvent) -> Result<&str, MissingSubject> {
    event.subject().ok_or(MissingSubject)
}

#[cfg(test)]
mod test {
    use super::*;

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

    fn event() -> CloudEvent {
        CloudEvent::new("1", "urn:venty:test", "counter.incremented")
    }

    #[test]
    fn rehydration_advances_version_without_recording_changes() {
        let mut root = EntityRoot::new(Counter { id: "1".into(), total: 0 });

        root.apply_rehydrated_event(event());
        root.apply_rehydrated_event(event());

        assert_eq!(root.version(), 1);
        assert_eq!(root.entity().total, 2);
        assert!(root.uncommitted_changes().is_empty());
    }

    #[test]
    fn applying_new_events_enqueues_them_as_uncommitted() {
        let mut root = EntityRoot::new(Counter { id: "1".into(), total: 0 });

        root.apply(event());

        assert_eq!(root.version(), NO_EVENT_VERSION);
        assert_eq!(root.uncommitted_changes().len(), 1);
        assert_eq!(root.entity().total, 1);
    }

    #[test]
    fn committing_clears_the_queue_and_advances_version() {
        let mut root = EntityRoot::new(Counter { id: "1".into(), total: 0 });

        root.apply(event());
        root.apply(event());
        root.mark_changes_as_committed();

        assert_eq!(root.version(), 1);
        assert!(root.uncommitted_changes().is_empty());
    }

    #[test]
    fn aggregate_uuid_is_stable_for_the_same_id() {
        assert_eq!(aggregate_uuid("order-1"), aggregate_uuid("order-1"));
        assert_ne!(aggregate_uuid("order-1"), aggregate_uuid("order-2"));
    }

    #[test]
    fn subject_aggregate_fails_without_a_subject() {
        let event = CloudEvent::new("1", "urn:venty:test", "test.event");
        assert_eq!(subject_aggregate(&event), Err(MissingSubject));
    }
}
