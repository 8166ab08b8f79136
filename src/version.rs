//! Optimistic concurrency control through expected stream versions.

use crate::types::{CurrentVersion, StreamState, StreamVersion, NO_EVENT_VERSION};

/// The caller's belief about a stream's version before an append, used to
/// decide whether to accept or reject the append.
///
/// Either a concrete [`StreamVersion`] the stream must currently be at, or
/// one of the [`StreamState`] tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No expectation; always accepted.
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The stream must already exist, at any version.
    Exists,
    /// The stream must be at exactly this version.
    Exact(StreamVersion),
}

impl From<StreamState> for ExpectedVersion {
    fn from(state: StreamState) -> Self {
        match state {
            StreamState::Any => ExpectedVersion::Any,
            StreamState::NoStream => ExpectedVersion::NoStream,
            StreamState::Exists => ExpectedVersion::Exists,
        }
    }
}

impl From<StreamVersion> for ExpectedVersion {
    fn from(version: StreamVersion) -> Self {
        ExpectedVersion::Exact(version)
    }
}

/// Decides whether `expected` is satisfied by a stream whose current
/// version is produced by `actual`.
///
/// `actual` is a lazy supplier rather than a plain value so that callers
/// with `expected = Any` never pay for a version lookup they don't need.
///
/// See `spec.md` §4.1 for the full decision table this function
/// implements.
pub fn is_version_correct(
    expected: ExpectedVersion,
    actual: impl FnOnce() -> CurrentVersion,
) -> bool {
    if expected == ExpectedVersion::Any {
        return true;
    }

    let actual = actual();

    match expected {
        ExpectedVersion::Any => true,
        ExpectedVersion::Exists => actual != CurrentVersion::NoStream,
        ExpectedVersion::NoStream => actual == CurrentVersion::NoStream,
        ExpectedVersion::Exact(v) if v == NO_EVENT_VERSION => {
            matches!(
                actual,
                CurrentVersion::NoStream | CurrentVersion::Current(NO_EVENT_VERSION)
            )
        }
        ExpectedVersion::Exact(v) => actual == CurrentVersion::Current(v),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn check(expected: ExpectedVersion, actual: CurrentVersion) -> bool {
        is_version_correct(expected, || actual)
    }

    #[test]
    fn any_always_matches() {
        assert!(check(ExpectedVersion::Any, CurrentVersion::NoStream));
        assert!(check(ExpectedVersion::Any, CurrentVersion::Current(NO_EVENT_VERSION)));
        assert!(check(ExpectedVersion::Any, CurrentVersion::Current(5)));
    }

    #[test]
    fn exists_rejects_no_stream_only() {
        assert!(!check(ExpectedVersion::Exists, CurrentVersion::NoStream));
        assert!(check(ExpectedVersion::Exists, CurrentVersion::Current(NO_EVENT_VERSION)));
        assert!(check(ExpectedVersion::Exists, CurrentVersion::Current(5)));
    }

    #[test]
    fn no_stream_accepts_no_stream_only() {
        assert!(check(ExpectedVersion::NoStream, CurrentVersion::NoStream));
        assert!(!check(ExpectedVersion::NoStream, CurrentVersion::Current(NO_EVENT_VERSION)));
        assert!(!check(ExpectedVersion::NoStream, CurrentVersion::Current(5)));
    }

    #[test]
    fn no_event_version_accepts_no_stream_and_empty_stream() {
        let expected = ExpectedVersion::Exact(NO_EVENT_VERSION);
        assert!(check(expected, CurrentVersion::NoStream));
        assert!(check(expected, CurrentVersion::Current(NO_EVENT_VERSION)));
        assert!(!check(expected, CurrentVersion::Current(0)));
    }

    #[test]
    fn concrete_version_only_matches_exactly() {
        let expected = ExpectedVersion::Exact(4);
        assert!(!check(expected, CurrentVersion::NoStream));
        assert!(!check(expected, CurrentVersion::Current(NO_EVENT_VERSION)));
        assert!(!check(expected, CurrentVersion::Current(3)));
        assert!(check(expected, CurrentVersion::Current(4)));
    }
}
