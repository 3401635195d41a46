//! Tracing integration for reqflow pipelines.

use crate::errors::{ReqflowError, Result};
use std::time::Instant;
use tracing::Span;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs a global `fmt` subscriber filtered by `filter`.
///
/// An empty `filter` falls back to `RUST_LOG`, then to `info`.
///
/// # Errors
///
/// Returns `ReqflowError::Config` if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(filter: &str) -> Result<()> {
    let filter = if filter.is_empty() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_new(filter)
            .map_err(|e| ReqflowError::Config(format!("invalid tracing filter: {e}")))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ReqflowError::Config(format!("tracing already initialized: {e}")))
}

/// Creates the span a root processor runs inside.
#[must_use]
pub fn pipeline_span(title: &str, request_id: Uuid) -> Span {
    tracing::info_span!("pipeline", title = %title, request_id = %request_id)
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}
