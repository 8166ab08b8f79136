//! A minimal [CloudEvents](https://cloudevents.io) value object.
//!
//! `spec.md` treats the event envelope as an external collaborator,
//! "assumed available as a record with the mandatory attributes `id`,
//! `source`, `type`, `specversion`, plus optional `subject`, `time`,
//! `data`". This module provides exactly that record and nothing more:
//! the store never inspects any field beyond using the whole value as an
//! opaque, serializable blob.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The CloudEvents `specversion` implemented by [`CloudEvent::new`].
pub const SPEC_VERSION: &str = "1.0";

/// An immutable CloudEvents envelope.
///
/// Field names mirror the CloudEvents attribute names, except `type`
/// (a Rust keyword), which is exposed as [`CloudEvent::ty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    id: String,
    source: String,
    #[serde(rename = "type")]
    ty: String,
    specversion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<time::OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CloudEvent {
    /// Builds a new [`CloudEvent`] with the mandatory attributes and
    /// `specversion` defaulted to [`SPEC_VERSION`].
    pub fn new(id: impl Into<String>, source: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            ty: ty.into(),
            specversion: SPEC_VERSION.to_owned(),
            subject: None,
            time: None,
            data: None,
        }
    }

    /// Sets the optional `subject` attribute.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the optional `time` attribute.
    #[must_use]
    pub fn with_time(mut self, time: time::OffsetDateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Sets the optional `data` payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The event's unique identifier, scoped to its `source`.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The context in which the event occurred.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The type of occurrence this event represents.
    #[inline]
    pub fn ty(&self) -> &str {
        &self.ty
    }

    /// The CloudEvents spec version this event conforms to.
    #[inline]
    pub fn specversion(&self) -> &str {
        &self.specversion
    }

    /// The subject of the event in the context of its `source`, if any.
    #[inline]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The timestamp of the occurrence, if any.
    #[inline]
    pub fn time(&self) -> Option<time::OffsetDateTime> {
        self.time
    }

    /// The event payload, if any.
    #[inline]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let event = CloudEvent::new("1", "urn:venty:test", "test.event")
            .with_subject("aggregate-1")
            .with_data(serde_json::json!({"hello": "world"}));

        let json = serde_json::to_string(&event).expect("serialize");
        let decoded: CloudEvent = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(event, decoded);
        assert_eq!(decoded.specversion(), SPEC_VERSION);
    }
}
