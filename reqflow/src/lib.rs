//! # Reqflow
//!
//! Hierarchical request processing pipelines.
//!
//! A request is served by a tree of processors:
//!
//! - **Root**: walks the top-level handler chain, owns the response code,
//!   payload and global variables, and realizes the response once
//! - **Group**: a nested handler chain with its own local variables
//! - **Conditional**: a test handler choosing between two branches
//!
//! Handlers read and write variables through any processor. Local variables
//! shadow globals; global writes always land on the root. Any handler may
//! answer or abort the request, which stops every enclosing chain.
//!
//! ## Quick Start
//!
//! ```rust
//! use reqflow::prelude::*;
//! use serde_json::json;
//!
//! let pipeline = Pipeline::new(PipelineConfig::new().with_title("hello"), json_responder())
//!     .with_handler(handler(|p, ctx| {
//!         let name = ctx.request().param("name").unwrap_or("world").to_string();
//!         p.set("name", json!(name));
//!     }))
//!     .with_handler(handler(|p, _| {
//!         let name = p.get("name").cloned().unwrap_or_default();
//!         p.answer_with_data(200, json!({ "greeting": name }).as_object().cloned());
//!     }));
//!
//! let ctx = RequestContext::new(InboundRequest::new("GET", "/hello").with_param("name", "ada"));
//! let outcome = pipeline.process(ctx.clone());
//!
//! assert_eq!(outcome.code, 200);
//! assert_eq!(ctx.response().and_then(|r| r.body), Some(json!({ "greeting": "ada" })));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod processor;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{InboundRequest, OutboundResponse, Payload, RequestContext};
    pub use crate::errors::{MissingKeyError, ReqflowError, Result};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{
        json_responder, status_responder, Pipeline, PipelineConfig, PipelineOutcome,
    };
    pub use crate::processor::{
        branch, handler, BranchHandler, ChainControl, ConditionalProcessor, GroupProcessor,
        Handler, Processor, ProcessorKind, RootProcessor, VariableScope, VariableScopeExt,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use serde_json::json;

    #[test]
    fn test_prelude_builds_a_nested_pipeline() {
        let pipeline = Pipeline::new(PipelineConfig::default(), status_responder()).with_handler(
            handler(|p, _| {
                let mut group = GroupProcessor::new(p);
                group.then(handler(|g, _| {
                    let depth = g.depth();
                    g.set("depth", json!(depth));
                }));
                group.run();
            }),
        );

        let outcome =
            pipeline.process(RequestContext::new(InboundRequest::new("GET", "/")));

        assert_eq!(outcome.variables.get("depth"), Some(&json!(1)));
        assert_eq!(outcome.code, 200);
    }
}
