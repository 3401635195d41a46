//! The request context handle shared by every processor of a pipeline.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A response payload: a string-keyed JSON object.
pub type Payload = serde_json::Map<String, Value>;

/// The inbound side of a request exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundRequest {
    /// Request method (e.g. "GET").
    pub method: String,
    /// Request path.
    pub path: String,
    /// Path parameters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, String>,
    /// Query parameters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub query: HashMap<String, String>,
    /// Request headers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Decoded request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl InboundRequest {
    /// Creates a new inbound request.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Adds a path parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Gets a path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Gets a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// The outbound response realized by a response handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundResponse {
    /// Response code.
    pub code: u16,
    /// Response body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug)]
struct RequestState {
    request_id: Uuid,
    received_at: DateTime<Utc>,
    request: InboundRequest,
    response: Mutex<Option<OutboundResponse>>,
}

/// Handle to one in-flight request/response exchange.
///
/// Cloning the handle is cheap and every clone refers to the same exchange.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<RequestState>,
}

impl RequestContext {
    /// Creates a context for an inbound request.
    #[must_use]
    pub fn new(request: InboundRequest) -> Self {
        Self::with_request_id(Uuid::new_v4(), request)
    }

    /// Creates a context with a caller-supplied request ID.
    #[must_use]
    pub fn with_request_id(request_id: Uuid, request: InboundRequest) -> Self {
        Self {
            inner: Arc::new(RequestState {
                request_id,
                received_at: Utc::now(),
                request,
                response: Mutex::new(None),
            }),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.inner.request_id
    }

    /// Returns when the request was received.
    #[must_use]
    pub fn received_at(&self) -> DateTime<Utc> {
        self.inner.received_at
    }

    /// Returns the inbound request.
    #[must_use]
    pub fn request(&self) -> &InboundRequest {
        &self.inner.request
    }

    /// Writes the outbound response, replacing any earlier one.
    pub fn respond(&self, code: u16, body: Option<Value>) {
        let mut response = self.inner.response.lock();
        if response.is_some() {
            tracing::warn!(
                request_id = %self.inner.request_id,
                code,
                "Replacing an already written response"
            );
        }
        *response = Some(OutboundResponse { code, body });
    }

    /// Returns a copy of the outbound response, if written.
    #[must_use]
    pub fn response(&self) -> Option<OutboundResponse> {
        self.inner.response.lock().clone()
    }

    /// Returns true once a response has been written.
    #[must_use]
    pub fn has_responded(&self) -> bool {
        self.inner.response.lock().is_some()
    }

    /// Returns true if both handles refer to the same exchange.
    #[must_use]
    pub fn same_exchange(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
