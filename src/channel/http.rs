//! Publishes events to a fixed URL over HTTP, in either CloudEvents
//! encoding.
//!
//! Grounded on the original `HttpEventChannel`/`HttpChannelMode`: the
//! same two encodings, dispatched the same way, built here on
//! `reqwest` rather than a hand-rolled client, following the teacher's
//! ecosystem choice of `reqwest` for outbound HTTP (see
//! `eventually-app-example/Cargo.toml`).

use async_trait::async_trait;

use crate::cloud_event::CloudEvent;

use super::Channel;

/// The two wire encodings defined by the CloudEvents HTTP protocol
/// binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpChannelMode {
    /// CloudEvent attributes as `ce-*` headers, `data` as the body.
    Binary,
    /// A single JSON object, sent with
    /// `content-type: application/cloudevents+json`.
    Structured,
}

/// Publishes events by issuing one POST request per event to a fixed
/// URL.
pub struct HttpChannel {
    client: reqwest::Client,
    url: String,
    mode: HttpChannelMode,
}

impl HttpChannel {
    /// Publishes to `url` using `mode`, over a freshly built client.
    pub fn new(url: impl Into<String>, mode: HttpChannelMode) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            mode,
        }
    }

    /// Like [`HttpChannel::new`], reusing a caller-supplied client.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>, mode: HttpChannelMode) -> Self {
        Self { client, url: url.into(), mode }
    }

    async fn publish_one(&self, event: CloudEvent) -> Result<(), HttpChannelError> {
        let request = match self.mode {
            HttpChannelMode::Structured => self.to_structured(event),
            HttpChannelMode::Binary => self.to_binary(event),
        };

        let response = request.send().await?;
        response.error_for_status()?;

        Ok(())
    }

    fn to_structured(&self, event: CloudEvent) -> reqwest::RequestBuilder {
        self.client
            .post(self.url.as_str())
            .header("content-type", "application/cloudevents+json")
            .json(&event)
    }

    fn to_binary(&self, event: CloudEvent) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.url.as_str())
            .header("ce-id", event.id())
            .header("ce-source", event.source())
            .header("ce-type", event.ty())
            .header("ce-specversion", event.specversion());

        if let Some(subject) = event.subject() {
            request = request.header("ce-subject", subject);
        }

        if let Some(time) = event.time() {
            if let Ok(formatted) = time.format(&time::format_description::well_known::Rfc3339) {
                request = request.header("ce-time", formatted);
            }
        }

        match event.data() {
            Some(data) => request.header("content-type", "application/json").json(data),
            None => request,
        }
    }
}

#[async_trait]
impl Channel for HttpChannel {
    type Error = HttpChannelError;

    async fn publish(&self, events: Vec<CloudEvent>) -> Result<(), Self::Error> {
        for event in events {
            self.publish_one(event).await?;
        }

        Ok(())
    }
}

/// Error returned by [`HttpChannel::publish`].
#[derive(Debug, thiserror::Error)]
#[error("failed to publish event over http: {0}")]
pub struct HttpChannelError(#[from] reqwest::Error);
