//! Strong types wrapping the plain integers and strings used throughout
//! the event store, so a stream position can never be mistaken for a
//! commit position or vice versa.

use std::fmt;

/// Identifies a stream inside one [`crate::EventStore`] instance.
///
/// A stream name is unique only in the context of the store it belongs
/// to: implementations MUST NOT assume it is unique across stores.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamName(String);

impl StreamName {
    /// Creates a new [`StreamName`] from anything convertible to a `String`.
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the stream name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StreamName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// The 0-based, dense position of an event within a single stream.
///
/// The first event committed to a stream is assigned position `0`;
/// subsequent events increase by exactly `1` with no gaps (invariant I1).
pub type StreamVersion = i64;

/// Sentinel [`StreamVersion`] meaning "the stream has not yet received
/// any event".
///
/// Distinguished from [`StreamState::NoStream`]: a backend may have a
/// stream that physically exists (e.g. a row in a stream table) with
/// zero materialized events, in which case `current_version` still
/// reports `NO_EVENT_VERSION` rather than `NoStream`.
pub const NO_EVENT_VERSION: StreamVersion = -1;

/// The store-wide, strictly increasing position of a committed event.
///
/// An empty store reports commit position `-1`, i.e. "before the first
/// possible event" (invariant I2).
pub type CommitPosition = i64;

/// Sentinel [`CommitPosition`] reported by an empty store.
pub const NO_COMMIT_POSITION: CommitPosition = -1;

/// Tags used by [`crate::version::ExpectedVersion`] in place of a concrete
/// [`StreamVersion`], and returned by [`crate::EventStore::current_version`]
/// for streams that have never been appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No expectation on the stream's current version; always accepted.
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The stream must already exist, at any version.
    Exists,
}

/// The reported current version of a stream: either a concrete, committed
/// [`StreamVersion`] or the [`StreamState::NoStream`] tag (invariant I5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentVersion {
    /// The stream exists and its last committed event has this version.
    Current(StreamVersion),
    /// No events exist for this stream name.
    NoStream,
}

impl CurrentVersion {
    /// Returns the underlying [`StreamVersion`], treating a missing stream
    /// as [`NO_EVENT_VERSION`].
    #[inline]
    pub fn as_version(self) -> StreamVersion {
        match self {
            CurrentVersion::Current(v) => v,
            CurrentVersion::NoStream => NO_EVENT_VERSION,
        }
    }
}
