//! A sink that retains every event published to it, for test assertions.

use std::convert::Infallible;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::cloud_event::CloudEvent;

use super::Channel;

/// Retains every event published to it in the order they arrived.
///
/// Mirrors the original `InMemoryEventChannel`'s `published_events`
/// accessor.
#[derive(Default)]
pub struct InMemoryChannel {
    published: Mutex<Vec<CloudEvent>>,
}

impl InMemoryChannel {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// A read-only snapshot of everything published so far.
    pub fn published_events(&self) -> Vec<CloudEvent> {
        self.published.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Channel for InMemoryChannel {
    type Error = Infallible;

    async fn publish(&self, events: Vec<CloudEvent>) -> Result<(), Self::Error> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(events);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::ChannelExt;

    #[tokio::test]
    async fn retains_published_events_in_order() {
        let channel = InMemoryChannel::new();

        channel
            .publish_event(CloudEvent::new("1", "urn:venty:test", "test.event"))
            .await
            .unwrap();
        channel
            .publish_event(CloudEvent::new("2", "urn:venty:test", "test.event"))
            .await
            .unwrap();

        let published = channel.published_events();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].id(), "1");
        assert_eq!(published[1].id(), "2");
    }
}
