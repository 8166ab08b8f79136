//! A sink that discards everything published to it.

use async_trait::async_trait;
use std::convert::Infallible;

use crate::cloud_event::CloudEvent;

use super::Channel;

/// Consumes and discards every event published to it.
///
/// Useful as a default collaborator in tests, or for components that
/// make publication optional.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChannel;

#[async_trait]
impl Channel for NullChannel {
    type Error = Infallible;

    async fn publish(&self, _events: Vec<CloudEvent>) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::channel::ChannelExt;

    #[tokio::test]
    async fn swallows_everything() {
        let channel = NullChannel;
        channel
            .publish_event(CloudEvent::new("1", "urn:venty:test", "test.event"))
            .await
            .unwrap();
    }
}
