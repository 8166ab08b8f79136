//! Error types returned by the store and aggregate abstractions.
//!
//! Version mismatch is deliberately *not* one of the variants here: it is
//! a normal outcome of optimistic concurrency, surfaced as `None` from
//! [`crate::EventStore::attempt_append`] or as [`WrongExpectedVersion`]
//! from [`crate::EventStore::append`], not as an exception in the common
//! path.

use thiserror::Error;

/// Error returned by [`crate::EventStore::append`] when the expected
/// version supplied by the caller does not match the stream's actual
/// version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wrong expected version for stream")]
pub struct WrongExpectedVersion;

/// Error raised when a deadline set via `timeout` elapses while consuming
/// the events passed to an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("timed out before the operation completed")]
pub struct TimeoutError;

/// Error raised when an aggregate helper needs the `subject` attribute of
/// a [`crate::CloudEvent`] to derive an aggregate identifier, and the event
/// carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event has no subject attribute to derive an aggregate id from")]
pub struct MissingSubject;

/// Umbrella error type for failures that do not fit the structured,
/// expected outcomes above: a connection drop, a malformed row, a
/// serialization failure, and so on.
///
/// Backend implementations should prefer propagating the underlying
/// error unchanged through this variant rather than losing context by
/// converting it into a bespoke enum, mirroring how the teacher crate's
/// [`anyhow::Error`] is threaded through `AppendError::Internal`.
#[derive(Debug, Error)]
pub enum Error {
    /// A deadline elapsed before the operation completed. No writes occur.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// An aggregate helper was invoked on an event with no `subject`.
    #[error(transparent)]
    MissingSubject(#[from] MissingSubject),

    /// Any other backend failure, propagated unchanged.
    #[error("event store backend failed: {0}")]
    Backend(#[source] anyhow::Error),
}

impl Error {
    /// Wraps an arbitrary backend error into [`Error::Backend`].
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Error::Backend(err.into())
    }
}
