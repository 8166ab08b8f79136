//! A scoped stack of [`Producer`]s, delegating to whichever was pushed
//! most recently.
//!
//! Grounded on the original `EventProducerStack.scoped_event_producer`,
//! a context manager guaranteeing pop-on-exit even when the scoped body
//! raises. Rust has no context managers; the equivalent here is an RAII
//! guard whose `Drop` impl performs the pop, so the release happens on
//! every exit path including a panic unwinding through the scope.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::cloud_event::CloudEvent;
use crate::producer::Producer;

/// An ordered set of scoped [`Producer`]s; [`ProducerStack::produce_event`]
/// always delegates to the most recently pushed one still in scope.
pub struct ProducerStack {
    producers: Mutex<Vec<Box<dyn Producer>>>,
}

impl ProducerStack {
    /// Builds a stack whose bottom, always-present entry is `default`.
    pub fn new(default: impl Producer + 'static) -> Self {
        Self {
            producers: Mutex::new(vec![Box::new(default)]),
        }
    }

    /// Pushes `producer` as the new top of the stack, returning a guard
    /// that pops it back off when dropped.
    ///
    /// Borrows `self` for the guard's lifetime, so the guard cannot
    /// outlive the stack it scopes into.
    pub fn scoped<'s>(&'s self, producer: impl Producer + 'static) -> ScopedProducer<'s> {
        self.producers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(producer));

        ScopedProducer { stack: self }
    }
}

impl Producer for ProducerStack {
    fn produce_event(&self, ty: &str, data: Option<Value>, attributes: HashMap<String, String>) -> CloudEvent {
        let producers = self.producers.lock().unwrap_or_else(|e| e.into_inner());
        let top = producers.last().expect("bottom entry is never popped");
        top.produce_event(ty, data, attributes)
    }
}

/// Pops the scoped producer it was created for when dropped.
#[must_use = "dropping this immediately pops the producer it just pushed"]
pub struct ScopedProducer<'s> {
    stack: &'s ProducerStack,
}

impl Drop for ScopedProducer<'_> {
    fn drop(&mut self) {
        let mut producers = self.stack.producers.lock().unwrap_or_else(|e| e.into_inner());
        if producers.len() > 1 {
            producers.pop();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::producer::SimpleProducer;
    use uuid::Uuid;

    #[test]
    fn delegates_to_the_default_producer_with_nothing_scoped() {
        let stack = ProducerStack::new(SimpleProducer::for_testing("urn:venty:default", Uuid::nil()));

        let event = stack.produce_event("test.event", None, HashMap::new());
        assert_eq!(event.source(), "urn:venty:default");
    }

    #[test]
    fn delegates_to_the_most_recently_scoped_producer() {
        let stack = ProducerStack::new(SimpleProducer::for_testing("urn:venty:default", Uuid::nil()));

        {
            let _scope = stack.scoped(SimpleProducer::for_testing("urn:venty:inner", Uuid::nil()));
            let event = stack.produce_event("test.event", None, HashMap::new());
            assert_eq!(event.source(), "urn:venty:inner");
        }

        let event = stack.produce_event("test.event", None, HashMap::new());
        assert_eq!(event.source(), "urn:venty:default");
    }

    #[test]
    fn the_scope_is_released_even_when_unwinding() {
        let stack = ProducerStack::new(SimpleProducer::for_testing("urn:venty:default", Uuid::nil()));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = stack.scoped(SimpleProducer::for_testing("urn:venty:inner", Uuid::nil()));
            panic!("boom");
        }));

        assert!(result.is_err());

        let event = stack.produce_event("test.event", None, HashMap::new());
        assert_eq!(event.source(), "urn:venty:default");
    }
}
