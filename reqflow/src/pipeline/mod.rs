//! Pipeline definitions, configuration and stock response handlers.
//!
//! A [`Pipeline`] is the reusable part of request processing: a config, a
//! top-level handler chain and a response handler. Every request gets its
//! own [`RootProcessor`](crate::processor::RootProcessor).

mod config;
mod definition;
mod responders;


pub use config::PipelineConfig;
pub use definition::{Pipeline, PipelineOutcome};
pub use responders::{json_responder, status_responder};
