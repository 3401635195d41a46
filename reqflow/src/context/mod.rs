//! Request and variable contexts.
//!
//! This module provides:
//! - The request context handle passed to every handler
//! - Lazily allocated per-processor variable stores

mod request;
mod store;

pub use request::{InboundRequest, OutboundResponse, Payload, RequestContext};
pub use store::VariableStore;
