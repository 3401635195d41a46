//! Test fixtures for building requests.

use serde_json::Value;

use crate::context::{InboundRequest, RequestContext};

/// A request context builder.
#[derive(Debug, Clone, Default)]
pub struct TestRequest {
    request: InboundRequest,
}

impl TestRequest {
    /// Starts a request with the given method and path.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request: InboundRequest::new(method, path),
        }
    }

    /// Starts a GET request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Starts a POST request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new("POST", path).with_body(body)
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_param(name, value);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request = self.request.with_header(name, value);
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.request = self.request.with_body(body);
        self
    }

    /// Builds the request context.
    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext::new(self.request)
    }
}
