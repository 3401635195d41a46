//! Pipeline configuration.

use crate::errors::{ReqflowError, Result};
use serde::{Deserialize, Serialize};

fn default_title() -> String {
    "request".to_string()
}

const fn default_code() -> u16 {
    200
}

/// Configuration shared by every run of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Title given to the root processor.
    #[serde(default = "default_title")]
    pub title: String,
    /// Response code used when no handler sets one.
    #[serde(default = "default_code")]
    pub default_code: u16,
    /// Logs every handler step at debug level.
    #[serde(default)]
    pub trace_handlers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            default_code: default_code(),
            trace_handlers: false,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the default response code.
    #[must_use]
    pub const fn with_default_code(mut self, code: u16) -> Self {
        self.default_code = code;
        self
    }

    /// Enables or disables per-handler step logs.
    #[must_use]
    pub const fn with_trace_handlers(mut self, enabled: bool) -> Self {
        self.trace_handlers = enabled;
        self
    }

    /// Parses and validates a configuration from JSON.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns `ReqflowError::Serialization` on malformed JSON and
    /// `ReqflowError::Config` if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ReqflowError::Config` if the title is empty or the default
    /// code is not a valid HTTP status.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ReqflowError::Config("title must not be empty".to_string()));
        }
        if !(100..=599).contains(&self.default_code) {
            return Err(ReqflowError::Config(format!(
                "default_code {} is outside 100..=599",
                self.default_code
            )));
        }
        Ok(())
    }
}
