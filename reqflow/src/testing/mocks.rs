//! Recording handlers and sinks for testing.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use crate::context::Payload;
use crate::events::EventSink;
use crate::processor::{branch, handler, BranchHandler, Handler, Processor};

/// A shared, ordered log of handler invocations.
///
/// Clones share the same log, so a clone can be moved into handlers while
/// the test keeps another to inspect.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, label: impl Into<String>) {
        self.entries.lock().push(label.into());
    }

    /// Returns a handler that appends `label` when invoked.
    #[must_use]
    pub fn recorder(&self, label: &str) -> Handler {
        let log = self.clone();
        let label = label.to_string();
        handler(move |_, _| log.push(label.clone()))
    }

    /// Returns a branch handler that appends `label` when invoked.
    #[must_use]
    pub fn branch_recorder(&self, label: &str) -> BranchHandler {
        let log = self.clone();
        let label = label.to_string();
        branch(move |_, _| log.push(label.clone()))
    }

    /// Returns all entries in invocation order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns how many times `label` was recorded.
    #[must_use]
    pub fn count(&self, label: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == label).count()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// What a response handler saw: code, payload and abort flag.
pub type RecordedResponse = (u16, Option<Payload>, bool);

/// A response handler that records every invocation.
#[derive(Debug, Clone, Default)]
pub struct RecordingResponder {
    responses: Arc<Mutex<Vec<RecordedResponse>>>,
}

impl RecordingResponder {
    /// Creates a new recording responder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the response handler to install on a root processor.
    ///
    /// The handler also writes the response to the request context.
    #[must_use]
    pub fn handler(&self) -> Handler {
        let responses = Arc::clone(&self.responses);
        handler(move |p, ctx| {
            let payload = p.response_payload().cloned();
            ctx.respond(p.response_code(), payload.clone().map(Value::Object));
            responses
                .lock()
                .push((p.response_code(), payload, p.aborted()));
        })
    }

    /// Returns the number of times the handler was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.responses.lock().len()
    }

    /// Returns the most recent invocation.
    #[must_use]
    pub fn last(&self) -> Option<RecordedResponse> {
        self.responses.lock().last().cloned()
    }
}

/// A recorded event.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event type.
    pub event_type: String,
    /// Event data.
    pub data: Option<Value>,
}

/// An event sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<RecordedEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event_type: &str, data: Option<Value>) {
        self.events.lock().push(RecordedEvent {
            event_type: event_type.to_string(),
            data,
        });
    }
}
