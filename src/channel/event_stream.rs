//! Adapts an [`EventStore`] so it can be used wherever a [`Channel`] is
//! expected, appending published events under `expected_version = ANY`.

use async_trait::async_trait;

use crate::cloud_event::CloudEvent;
use crate::error::Error;
use crate::event_store::EventStore;
use crate::types::StreamName;
use crate::version::ExpectedVersion;

use super::Channel;

/// Publishes events by appending them to a fixed stream of a wrapped
/// [`EventStore`], under [`ExpectedVersion::Any`].
///
/// Grounded on the original `EventStreamChannel`, which lets an event
/// store double as a publication sink for components that only know
/// about the `Channel` surface.
pub struct EventStreamChannel<'s, S: ?Sized> {
    store: &'s S,
    stream: StreamName,
}

impl<'s, S: EventStore + ?Sized> EventStreamChannel<'s, S> {
    /// Publishes to `stream` on `store`.
    pub fn new(store: &'s S, stream: StreamName) -> Self {
        Self { store, stream }
    }
}

#[async_trait]
impl<S: EventStore + ?Sized> Channel for EventStreamChannel<'_, S> {
    type Error = Error;

    async fn publish(&self, events: Vec<CloudEvent>) -> Result<(), Self::Error> {
        self.store
            .attempt_append(self.stream.clone(), ExpectedVersion::Any, events, None)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::ChannelExt;
    use crate::event_store::EventStoreExt;
    use crate::inmemory::InMemoryEventStore;

    #[tokio::test]
    async fn published_events_become_readable_from_the_stream() {
        let store = InMemoryEventStore::new();
        let channel = EventStreamChannel::new(&store, StreamName::from("notifications"));

        channel
            .publish_event(CloudEvent::new("1", "urn:venty:test", "test.event"))
            .await
            .unwrap();

        let events = store
            .read_stream(StreamName::from("notifications"), None, usize::MAX, None)
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.id(), "1");
    }
}
