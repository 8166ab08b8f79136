//! Deadline-checked iteration, used while consuming the events passed to
//! an append so that a slow producer can't commit past its caller's
//! timeout.

use std::time::{Duration, Instant};

pub use crate::error::TimeoutError;

/// Wraps an [`Iterator`] so that every pull after the first checks an
/// optional deadline before yielding the next item.
///
/// The check happens *between* elements: an element already produced by
/// the inner iterator is never discarded once yielded.
pub struct IterateWithTimeout<I> {
    inner: I,
    deadline: Option<(Instant, Duration)>,
}

impl<I> IterateWithTimeout<I> {
    /// Wraps `inner`, raising [`TimeoutError`] from the iterator once
    /// `timeout` has elapsed since this call, if set.
    pub fn new(inner: I, timeout: Option<Duration>) -> Self {
        Self {
            inner,
            deadline: timeout.map(|timeout| (Instant::now(), timeout)),
        }
    }
}

impl<I> Iterator for IterateWithTimeout<I>
where
    I: Iterator,
{
    type Item = Result<I::Item, TimeoutError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((start, timeout)) = self.deadline {
            if start.elapsed() > timeout {
                return Some(Err(TimeoutError));
            }
        }

        self.inner.next().map(Ok)
    }
}

/// Extension trait adding [`IterateWithTimeout`] to any iterator.
pub trait IteratorTimeoutExt: Iterator + Sized {
    /// See [`IterateWithTimeout`].
    fn with_timeout(self, timeout: Option<Duration>) -> IterateWithTimeout<Self> {
        IterateWithTimeout::new(self, timeout)
    }
}

impl<I: Iterator> IteratorTimeoutExt for I {}

/// Consumes `iter` eagerly into a `Vec`, respecting an optional deadline.
///
/// Used by [`crate::EventStore::attempt_append`] implementations to
/// materialize the caller's event sequence before committing it: per
/// `spec.md` §4.2, consumption happens eagerly and a deadline exceeded
/// during consumption aborts the whole append with no writes.
pub fn collect_with_timeout<T>(
    iter: impl IntoIterator<Item = T>,
    timeout: Option<Duration>,
) -> Result<Vec<T>, TimeoutError> {
    iter.into_iter().with_timeout(timeout).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn yields_all_items_without_a_deadline() {
        let items: Vec<_> = IterateWithTimeout::new(1..=3, None)
            .collect::<Result<_, _>>()
            .expect("no timeout set");

        assert_eq!(items, vec![1, 2, 3]);
    }

    #[test]
    fn raises_once_the_deadline_has_elapsed() {
        let result = collect_with_timeout(
            std::iter::repeat_with(|| {
                std::thread::sleep(Duration::from_millis(5));
                0
            })
            .take(100),
            Some(Duration::from_millis(1)),
        );

        assert_eq!(result, Err(TimeoutError));
    }

    #[test]
    fn the_check_happens_between_elements_not_inside_them() {
        let mut iter = IterateWithTimeout::new(1..=2, Some(Duration::from_millis(20)));

        assert_eq!(iter.next(), Some(Ok(1)));

        std::thread::sleep(Duration::from_millis(25));

        // The deadline is now in the past, but it's only checked on this
        // next pull -- the first element above was already handed back.
        assert_eq!(iter.next(), Some(Err(TimeoutError)));
    }
}
