//! Reusable pipeline definitions.

use super::PipelineConfig;
use crate::context::{Payload, RequestContext};
use crate::events::{get_event_sink, EventSink};
use crate::processor::{Handler, Processor, RootProcessor};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A summary of one finished pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineOutcome {
    /// Root title.
    pub title: String,
    /// The request this run served.
    pub request_id: Uuid,
    /// Final response code.
    pub code: u16,
    /// Final response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    /// True if the run ended through an abort.
    pub aborted: bool,
    /// Global variables at the end of the run.
    pub variables: HashMap<String, Value>,
    /// Run duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

impl PipelineOutcome {
    /// Converts the outcome to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A handler chain and response handler that can serve many requests.
///
/// Each call to [`Pipeline::root`] stamps out a fresh root processor, so a
/// single definition can be shared across threads.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    handlers: Vec<Handler>,
    responder: Handler,
    events: Option<Arc<dyn EventSink>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(config: PipelineConfig, responder: Handler) -> Self {
        Self {
            config,
            handlers: Vec::new(),
            responder,
            events: None,
        }
    }

    /// Appends a handler.
    #[must_use]
    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Appends several handlers.
    #[must_use]
    pub fn with_handlers(mut self, handlers: impl IntoIterator<Item = Handler>) -> Self {
        self.handlers.extend(handlers);
        self
    }

    /// Sets the event sink. Without one, the process-wide sink is used.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the number of top-level handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if the pipeline has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Builds a root processor for one request.
    #[must_use]
    pub fn root(&self, context: RequestContext) -> RootProcessor {
        let events = self.events.clone().unwrap_or_else(get_event_sink);
        let mut root = RootProcessor::new(
            self.config.title.clone(),
            context,
            self.config.default_code,
            Arc::clone(&self.responder),
        )
        .with_event_sink(events)
        .with_handler_tracing(self.config.trace_handlers);
        root.append(self.handlers.iter().cloned());
        root
    }

    /// Runs the pipeline for one request and summarizes the result.
    #[must_use]
    pub fn process(&self, context: RequestContext) -> PipelineOutcome {
        let mut root = self.root(context);
        root.run();
        root.outcome()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("handlers", &self.handlers.len())
            .field("has_event_sink", &self.events.is_some())
            .finish_non_exhaustive()
    }
}
