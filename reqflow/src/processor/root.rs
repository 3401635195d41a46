//! The root processor: owner of the response and the global variables.

use super::{ChainControl, Handler, Processor, ProcessorKind, VariableScope};
use crate::context::{Payload, RequestContext, VariableStore};
use crate::errors::{misuse_fault, MissingKeyError};
use crate::events::{get_event_sink, EventSink};
use crate::observability::{pipeline_span, SpanTimer};
use crate::pipeline::PipelineOutcome;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The unique top-level processor of a pipeline.
///
/// The root walks its handler chain, holds the only authoritative response
/// code and payload, and realizes the response exactly once through its
/// response handler when the pipeline ends.
pub struct RootProcessor {
    title: String,
    context: RequestContext,
    finished: bool,
    aborted: bool,
    responded: bool,
    response_code: u16,
    response_payload: Option<Payload>,
    responder: Handler,
    chain: Vec<Handler>,
    cursor: usize,
    globals: VariableStore,
    events: Arc<dyn EventSink>,
    trace_handlers: bool,
    timer: Option<SpanTimer>,
    duration_ms: Option<f64>,
}

impl RootProcessor {
    /// Creates a root processor bound to a request.
    ///
    /// `default_code` is the response code used if no handler changes it;
    /// `responder` is invoked once, when the pipeline ends, to write the
    /// response to `context`.
    pub fn new(
        title: impl Into<String>,
        context: RequestContext,
        default_code: u16,
        responder: Handler,
    ) -> Self {
        Self {
            title: title.into(),
            context,
            finished: false,
            aborted: false,
            responded: false,
            response_code: default_code,
            response_payload: None,
            responder,
            chain: Vec::new(),
            cursor: 0,
            globals: VariableStore::new(),
            events: get_event_sink(),
            trace_handlers: false,
            timer: None,
            duration_ms: None,
        }
    }

    /// Sets the event sink for lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Enables per-handler debug logs.
    #[must_use]
    pub const fn with_handler_tracing(mut self, enabled: bool) -> Self {
        self.trace_handlers = enabled;
        self
    }

    /// Appends handlers to the chain.
    pub fn append(&mut self, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.chain.extend(handlers);
        self
    }

    /// Appends a single handler to the chain.
    pub fn then(&mut self, handler: Handler) -> &mut Self {
        self.chain.push(handler);
        self
    }

    /// Returns the global variable table.
    pub const fn variables(&self) -> &VariableStore {
        &self.globals
    }

    /// Returns the run duration once the response has been realized.
    pub const fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }

    /// True once the response handler has run.
    pub const fn has_responded(&self) -> bool {
        self.responded
    }

    /// Summarizes the current state of the pipeline.
    pub fn outcome(&self) -> PipelineOutcome {
        PipelineOutcome {
            title: self.title.clone(),
            request_id: self.context.request_id(),
            code: self.response_code,
            payload: self.response_payload.clone(),
            aborted: self.aborted,
            variables: self.globals.to_dict(),
            duration_ms: self.duration_ms,
        }
    }

    fn realize_response(&mut self) {
        let responder = Arc::clone(&self.responder);
        let ctx = self.context.clone();
        responder(self, &ctx);

        self.duration_ms = self.timer.take().map(SpanTimer::finish);

        debug!(
            title = %self.title,
            request_id = %self.context.request_id(),
            code = self.response_code,
            aborted = self.aborted,
            duration_ms = ?self.duration_ms,
            "Pipeline completed"
        );
        self.events.emit(
            "pipeline.completed",
            Some(json!({
                "title": self.title,
                "request_id": self.context.request_id().to_string(),
                "code": self.response_code,
                "aborted": self.aborted,
                "duration_ms": self.duration_ms,
            })),
        );
    }
}

impl fmt::Debug for RootProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootProcessor")
            .field("title", &self.title)
            .field("request_id", &self.context.request_id())
            .field("finished", &self.finished)
            .field("aborted", &self.aborted)
            .field("response_code", &self.response_code)
            .field("cursor", &self.cursor)
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl VariableScope for RootProcessor {
    fn has(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    fn has_local(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    fn must_get(&self, name: &str) -> Result<&Value, MissingKeyError> {
        self.globals
            .get(name)
            .ok_or_else(|| MissingKeyError::new(name))
    }

    fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        self.set_local(name, value)
    }

    fn set_local(&mut self, name: &str, value: Value) -> Option<Value> {
        self.globals.insert(name, value)
    }

    fn unset(&mut self, name: &str) -> Option<Value> {
        self.globals.remove(name)
    }

    // The root's table is the global scope.
    fn local_to_global(&mut self, _name: &str) {}
}

impl Processor for RootProcessor {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Root
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn depth(&self) -> usize {
        0
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn aborted(&self) -> bool {
        self.aborted
    }

    fn run(&mut self) {
        if self.finished {
            misuse_fault(ProcessorKind::Root, "run");
        }

        let span = pipeline_span(&self.title, self.context.request_id());
        let _entered = span.enter();

        self.timer = Some(SpanTimer::start(self.title.clone()));
        debug!(
            title = %self.title,
            request_id = %self.context.request_id(),
            handlers = self.chain.len(),
            "Pipeline started"
        );
        self.events.emit(
            "pipeline.started",
            Some(json!({
                "title": self.title,
                "request_id": self.context.request_id().to_string(),
                "handlers": self.chain.len(),
            })),
        );

        let ctx = self.context.clone();
        while !self.finished && self.cursor < self.chain.len() {
            let handler = Arc::clone(&self.chain[self.cursor]);
            if self.trace_handlers {
                debug!(title = %self.title, index = self.cursor, depth = 0, "Running handler");
            }
            handler(self, &ctx);
            self.cursor += 1;
        }

        self.finished = true;
        self.skip_to_end();
    }

    fn request_context(&self) -> &RequestContext {
        &self.context
    }

    fn abort(&mut self, code: u16, payload: Option<Payload>) {
        warn!(
            title = %self.title,
            request_id = %self.context.request_id(),
            code,
            "Pipeline aborted"
        );
        self.response_code = code;
        self.response_payload = payload;
        self.finished = true;
        self.aborted = true;
        self.events.emit(
            "pipeline.aborted",
            Some(json!({ "title": self.title, "code": code })),
        );
    }

    fn answer(&mut self, code: u16) {
        self.response_code = code;
        self.finished = true;
        self.events.emit(
            "pipeline.answered",
            Some(json!({ "title": self.title, "code": code })),
        );
    }

    fn answer_with_data(&mut self, code: u16, payload: Option<Payload>) {
        self.response_payload = payload;
        self.answer(code);
    }

    fn response_code(&self) -> u16 {
        self.response_code
    }

    fn response_payload(&self) -> Option<&Payload> {
        self.response_payload.as_ref()
    }

    fn set_response_code(&mut self, code: u16) {
        self.response_code = code;
    }

    fn set_response_payload(&mut self, payload: Option<Payload>) {
        self.response_payload = payload;
    }

    fn set_response_payload_value(&mut self, name: &str, value: Value) {
        self.response_payload
            .get_or_insert_with(Payload::new)
            .insert(name.to_string(), value);
    }

    fn as_chain(&mut self) -> Option<&mut dyn ChainControl> {
        Some(self)
    }
}

impl ChainControl for RootProcessor {
    fn skip_next(&mut self) {
        self.cursor += 1;
    }

    fn skip_to_end(&mut self) {
        self.cursor = self.chain.len();
        self.finished = true;

        if !self.responded {
            self.responded = true;
            self.realize_response();
        }
    }

    fn extend_chain(&mut self, handlers: Vec<Handler>) {
        self.chain.extend(handlers);
    }

    fn position(&self) -> usize {
        self.cursor
    }

    fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::handler;
    use crate::testing::{CallLog, CollectingEventSink, RecordingResponder, TestRequest};
    use pretty_assertions::assert_eq;

    fn new_root(responder: &RecordingResponder) -> RootProcessor {
        RootProcessor::new("root-test", TestRequest::get("/").build(), 200, responder.handler())
    }

    #[test]
    fn test_runs_chain_in_order() {
        let log = CallLog::new();
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        root.append([log.recorder("h1"), log.recorder("h2")])
            .then(log.recorder("h3"));

        root.run();

        assert_eq!(log.entries(), vec!["h1", "h2", "h3"]);
        assert_eq!(responder.calls(), 1);
        assert!(root.is_finished());
        assert!(!root.aborted());
        assert_eq!(root.response_code(), 200);
    }

    #[test]
    fn test_empty_chain_still_responds() {
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        root.run();

        assert_eq!(responder.calls(), 1);
        assert_eq!(responder.last(), Some((200, None, false)));
    }

    #[test]
    fn test_skip_next_skips_one_handler() {
        let log = CallLog::new();
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        root.append([
            handler(|p, _| {
                if let Some(chain) = p.as_chain() {
                    chain.skip_next();
                }
            }),
            log.recorder("skipped"),
            log.recorder("after"),
        ]);

        root.run();

        assert_eq!(log.entries(), vec!["after"]);
        assert_eq!(responder.calls(), 1);
    }

    #[test]
    fn test_answer_stops_chain() {
        let log = CallLog::new();
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        root.append([
            log.recorder("first"),
            handler(|p, _| p.answer(204)),
            log.recorder("never"),
        ]);

        root.run();

        assert_eq!(log.entries(), vec!["first"]);
        assert_eq!(root.response_code(), 204);
        assert!(!root.aborted());
        assert_eq!(responder.last(), Some((204, None, false)));
    }

    #[test]
    fn test_set_response_payload_value_allocates() {
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        assert!(root.response_payload().is_none());

        root.set_response_payload_value("id", json!(7));
        root.set_response_payload_value("name", json!("x"));

        let payload = root.response_payload().unwrap();
        assert_eq!(payload.get("id"), Some(&json!(7)));
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn test_root_scope_is_global() {
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);

        assert_eq!(root.set("k", json!(1)), None);
        assert!(root.has_local("k"));
        assert!(root.has("k"));
        root.local_to_global("k");
        assert_eq!(root.get("k"), Some(&json!(1)));
        assert_eq!(root.unset("k"), Some(json!(1)));
        assert_eq!(root.unset("k"), None);
        assert!(root.must_get("k").is_err());
    }

    #[test]
    fn test_lifecycle_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder).with_event_sink(sink.clone());
        root.then(handler(|p, _| p.answer_with_data(201, None)));

        root.run();

        assert_eq!(
            sink.event_types(),
            vec!["pipeline.started", "pipeline.answered", "pipeline.completed"]
        );
        assert!(root.duration_ms().is_some());
        assert!(root.has_responded());
    }

    #[test]
    fn test_outcome_snapshot() {
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        root.then(handler(|p, _| {
            p.set("user", json!("ada"));
            p.abort(403, json!({"error": "forbidden"}).as_object().cloned());
        }));
        root.run();

        let outcome = root.outcome();
        assert_eq!(outcome.code, 403);
        assert!(outcome.aborted);
        assert_eq!(outcome.variables.get("user"), Some(&json!("ada")));
        assert_eq!(outcome.title, "root-test");
    }

    #[test]
    #[should_panic(expected = "ERROR [ root ] run called after end of request processing")]
    fn test_run_twice_faults() {
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        root.run();
        root.run();
    }
}
