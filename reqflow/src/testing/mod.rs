//! Testing utilities for reqflow pipelines.
//!
//! This module provides:
//! - Recording handlers and responders
//! - Request fixtures
//! - Assertions over pipeline outcomes

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_aborted, assert_answered, assert_calls};
pub use fixtures::TestRequest;
pub use mocks::{
    CallLog, CollectingEventSink, RecordedEvent, RecordedResponse, RecordingResponder,
};
