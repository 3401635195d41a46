//! Error types for the reqflow framework.
//!
//! Two very different kinds of failure exist in a pipeline:
//!
//! - recoverable errors ([`ReqflowError`]) returned from variable access,
//!   configuration loading and tracing setup;
//! - misuse faults, raised as panics by [`misuse_fault`] when a processor is
//!   driven after it has finished.
//!
//! Pipeline aborts are neither: they are ordinary outcomes recorded on the
//! root processor.

use crate::processor::ProcessorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ReqflowError>;

/// The main error type for reqflow operations.
#[derive(Debug, Error)]
pub enum ReqflowError {
    /// A variable was required but is not set anywhere up the scope chain.
    #[error("{0}")]
    MissingKey(#[from] MissingKeyError),

    /// A stored variable could not be read as the requested type.
    #[error("Type mismatch for key '{name}': {reason}")]
    TypeMismatch {
        /// The variable name.
        name: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ReqflowError {
    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a missing key error.
    #[must_use]
    pub const fn is_missing_key(&self) -> bool {
        matches!(self, Self::MissingKey(_))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();

        match self {
            Self::MissingKey(err) => {
                map.insert("type".to_string(), serde_json::json!("MissingKey"));
                map.insert("name".to_string(), serde_json::json!(err.name));
            }
            Self::TypeMismatch { name, reason } => {
                map.insert("type".to_string(), serde_json::json!("TypeMismatch"));
                map.insert("name".to_string(), serde_json::json!(name));
                map.insert("reason".to_string(), serde_json::json!(reason));
            }
            Self::Config(_) => {
                map.insert("type".to_string(), serde_json::json!("Config"));
            }
            Self::Serialization(_) => {
                map.insert("type".to_string(), serde_json::json!("Serialization"));
            }
        }

        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

impl From<serde_json::Error> for ReqflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Error raised by `must_get` when a key is absent from the whole scope chain.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Key \"{name}\" does not exist")]
pub struct MissingKeyError {
    /// The missing key.
    pub name: String,
}

impl MissingKeyError {
    /// Creates a new missing key error.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Raises a misuse fault for a processor driven past its end.
///
/// The fault is logged and then raised as a panic; it is never meant to be
/// caught and continued.
#[track_caller]
pub fn misuse_fault(kind: ProcessorKind, operation: &str) -> ! {
    tracing::error!(
        processor = %kind,
        operation,
        "Processor driven after end of request processing"
    );
    panic!("ERROR [ {kind} ] {operation} called after end of request processing");
}
