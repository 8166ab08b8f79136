//! Thin publication sinks for [`CloudEvent`](crate::CloudEvent)s, separate
//! from the [`crate::EventStore`] contract.
//!
//! Grounded on the original `EventChannel` hierarchy: every sink exposes
//! one operation, `publish`, and the module provides the same four
//! concrete sinks (null, in-memory, HTTP, event-stream) plus a
//! best-effort decorator, mirroring how the teacher wraps a
//! `event::Store` with its `Tracking<T>` decorator in `event/store.rs`.

mod event_stream;
mod memory;
mod null;

#[cfg(feature = "http")]
mod http;

pub use event_stream::EventStreamChannel;
pub use memory::InMemoryChannel;
pub use null::NullChannel;

#[cfg(feature = "http")]
pub use http::{HttpChannel, HttpChannelMode};

use async_trait::async_trait;

use crate::cloud_event::CloudEvent;

/// A sink events can be published to.
#[async_trait]
pub trait Channel: Send + Sync {
    /// The error a failed publish surfaces.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publishes `events`, in order.
    async fn publish(&self, events: Vec<CloudEvent>) -> Result<(), Self::Error>;
}

/// Extension methods built on top of [`Channel::publish`].
#[async_trait]
pub trait ChannelExt: Channel {
    /// Publishes a single event.
    async fn publish_event(&self, event: CloudEvent) -> Result<(), Self::Error> {
        self.publish(vec![event]).await
    }

    /// Publishes `events`, observing any failure through `on_error`
    /// instead of propagating it.
    ///
    /// Mirrors the original `best_effort_publish_events` helper: a
    /// channel failure must never take down the caller that merely
    /// wanted to notify the outside world.
    async fn best_effort_publish(&self, events: Vec<CloudEvent>, on_error: impl FnOnce(Self::Error) + Send) {
        if let Err(err) = self.publish(events).await {
            on_error(err);
        }
    }

    /// Like [`ChannelExt::best_effort_publish`], for a single event.
    async fn best_effort_publish_event(&self, event: CloudEvent, on_error: impl FnOnce(Self::Error) + Send) {
        self.best_effort_publish(vec![event], on_error).await;
    }
}

impl<T: Channel + ?Sized> ChannelExt for T {}

/// Decorates a [`Channel`] so that publish failures are swallowed rather
/// than propagated, optionally observed through a callback.
///
/// Grounded on the original `best_effort_publish_events` free function,
/// turned into a decorator so it composes with any `Channel`
/// implementation instead of being copy-pasted at every call site.
pub struct BestEffort<C, F> {
    inner: C,
    on_error: F,
}

impl<C, F> BestEffort<C, F>
where
    C: Channel,
    F: Fn(C::Error) + Send + Sync,
{
    /// Wraps `inner`, routing publish failures to `on_error` instead of
    /// propagating them.
    pub fn new(inner: C, on_error: F) -> Self {
        Self { inner, on_error }
    }
}

#[async_trait]
impl<C, F> Channel for BestEffort<C, F>
where
    C: Channel,
    F: Fn(C::Error) + Send + Sync,
{
    type Error = std::convert::Infallible;

    async fn publish(&self, events: Vec<CloudEvent>) -> Result<(), Self::Error> {
        if let Err(err) = self.inner.publish(events).await {
            (self.on_error)(err);
        }

        Ok(())
    }
}
