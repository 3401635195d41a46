//! Stock response handlers.
//!
//! A response handler runs once, after the root's chain has ended, and
//! writes the root's response code and payload to the request context.

use crate::processor::{handler, Handler};
use serde_json::Value;

/// Writes the response code and, if present, the payload as a JSON object.
#[must_use]
pub fn json_responder() -> Handler {
    handler(|p, ctx| {
        let body = p.response_payload().cloned().map(Value::Object);
        ctx.respond(p.response_code(), body);
    })
}

/// Writes only the response code.
#[must_use]
pub fn status_responder() -> Handler {
    handler(|p, ctx| ctx.respond(p.response_code(), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{Processor, RootProcessor};
    use crate::testing::TestRequest;
    use serde_json::json;

    #[test]
    fn test_json_responder_writes_payload() {
        let ctx = TestRequest::get("/").build();
        let mut root = RootProcessor::new("json", ctx.clone(), 200, json_responder());
        root.then(handler(|p, _| {
            p.answer_with_data(201, json!({"id": 9}).as_object().cloned());
        }));
        root.run();

        let response = ctx.response().unwrap();
        assert_eq!(response.code, 201);
        assert_eq!(response.body, Some(json!({"id": 9})));
    }

    #[test]
    fn test_json_responder_without_payload() {
        let ctx = TestRequest::get("/").build();
        let mut root = RootProcessor::new("json", ctx.clone(), 204, json_responder());
        root.run();

        let response = ctx.response().unwrap();
        assert_eq!(response.code, 204);
        assert!(response.body.is_none());
    }

    #[test]
    fn test_status_responder_drops_payload() {
        let ctx = TestRequest::get("/").build();
        let mut root = RootProcessor::new("status", ctx.clone(), 200, status_responder());
        root.then(handler(|p, _| {
            p.abort(422, json!({"error": "invalid"}).as_object().cloned());
        }));
        root.run();

        let response = ctx.response().unwrap();
        assert_eq!(response.code, 422);
        assert!(response.body.is_none());
    }
}
