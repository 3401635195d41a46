//! Parent delegation shared by all non-root processors.

use super::{Handler, Processor, ProcessorKind};
use crate::context::{Payload, RequestContext, VariableStore};
use crate::errors::MissingKeyError;
use serde_json::Value;
use std::cell::OnceCell;
use std::fmt;

/// The state every nested processor keeps about its place in the tree.
///
/// A `ChildLink` borrows its parent for as long as the nested processor
/// lives. Response, abort and answer operations are forwarded to the parent;
/// the `finished` flag and local variables are owned here.
pub struct ChildLink<'p> {
    parent: &'p mut dyn Processor,
    finished: bool,
    locals: VariableStore,
    context: OnceCell<RequestContext>,
    initializer: Option<Handler>,
    finalizer: Option<Handler>,
}

impl<'p> ChildLink<'p> {
    /// Creates a link under `parent`.
    pub fn new(parent: &'p mut dyn Processor) -> Self {
        Self {
            parent,
            finished: false,
            locals: VariableStore::new(),
            context: OnceCell::new(),
            initializer: None,
            finalizer: None,
        }
    }

    /// Returns the parent processor.
    pub fn parent(&self) -> &dyn Processor {
        &*self.parent
    }

    /// Returns the parent processor mutably.
    pub fn parent_mut(&mut self) -> &mut dyn Processor {
        &mut *self.parent
    }

    /// Returns the local variable table.
    pub const fn locals(&self) -> &VariableStore {
        &self.locals
    }

    /// True once the owning processor has finished.
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }

    pub(crate) fn set_initializer(&mut self, initializer: Handler) {
        self.initializer = Some(initializer);
    }

    pub(crate) fn set_finalizer(&mut self, finalizer: Handler) {
        self.finalizer = Some(finalizer);
    }

    pub(crate) fn initializer(&self) -> Option<Handler> {
        self.initializer.clone()
    }

    pub(crate) fn finalizer(&self) -> Option<Handler> {
        self.finalizer.clone()
    }

    /// Returns the pipeline title.
    pub fn title(&self) -> &str {
        self.parent.title()
    }

    /// Returns the depth of the owning processor.
    pub fn depth(&self) -> usize {
        self.parent.depth() + 1
    }

    /// Returns the abort flag held by the root.
    pub fn aborted(&self) -> bool {
        self.parent.aborted()
    }

    /// Returns the request context, fetching it from the parent once.
    pub fn request_context(&self) -> &RequestContext {
        self.context
            .get_or_init(|| self.parent.request_context().clone())
    }

    /// Finishes locally and forwards the abort to the parent.
    pub fn abort(&mut self, code: u16, payload: Option<Payload>) {
        self.finished = true;
        self.parent.abort(code, payload);
    }

    /// Finishes locally and forwards the answer to the parent.
    pub fn answer(&mut self, code: u16) {
        self.finished = true;
        self.parent.answer(code);
    }

    /// Finishes locally and forwards the answer to the parent.
    pub fn answer_with_data(&mut self, code: u16, payload: Option<Payload>) {
        self.finished = true;
        self.parent.answer_with_data(code, payload);
    }

    /// Returns the root's response code.
    pub fn response_code(&self) -> u16 {
        self.parent.response_code()
    }

    /// Returns the root's response payload.
    pub fn response_payload(&self) -> Option<&Payload> {
        self.parent.response_payload()
    }

    /// Forwards a response code change.
    pub fn set_response_code(&mut self, code: u16) {
        self.parent.set_response_code(code);
    }

    /// Forwards a payload change.
    pub fn set_response_payload(&mut self, payload: Option<Payload>) {
        self.parent.set_response_payload(payload);
    }

    /// Forwards a payload entry change.
    pub fn set_response_payload_value(&mut self, name: &str, value: Value) {
        self.parent.set_response_payload_value(name, value);
    }

    /// True if `name` is local or resolves in an ancestor.
    pub fn has(&self, name: &str) -> bool {
        self.locals.contains(name) || self.parent.has(name)
    }

    /// True if `name` is local.
    pub fn has_local(&self, name: &str) -> bool {
        self.locals.contains(name)
    }

    /// Local value first, then the parent's resolution.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.locals.get(name) {
            Some(value) => Some(value),
            None => self.parent.get(name),
        }
    }

    /// Local value first, then the parent's strict resolution.
    pub fn must_get(&self, name: &str) -> Result<&Value, MissingKeyError> {
        match self.locals.get(name) {
            Some(value) => Ok(value),
            None => self.parent.must_get(name),
        }
    }

    /// Global writes always go to the parent.
    pub fn set(&mut self, name: &str, value: Value) -> Option<Value> {
        self.parent.set(name, value)
    }

    /// Writes into the local table.
    pub fn set_local(&mut self, name: &str, value: Value) -> Option<Value> {
        self.locals.insert(name, value)
    }

    /// Removes the local binding if present, otherwise asks the parent.
    pub fn unset(&mut self, name: &str) -> Option<Value> {
        if self.locals.contains(name) {
            return self.locals.remove(name);
        }
        self.parent.unset(name)
    }

    /// Moves a local binding up through the parent's `set`.
    pub fn local_to_global(&mut self, name: &str) {
        if let Some(value) = self.locals.remove(name) {
            self.parent.set(name, value);
        }
    }
}

impl fmt::Debug for ChildLink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildLink")
            .field("parent_kind", &self.parent.kind())
            .field("depth", &self.depth())
            .field("finished", &self.finished)
            .field("locals", &self.locals.keys())
            .finish_non_exhaustive()
    }
}

/// Implements the [`VariableScope`](super::VariableScope) methods of a
/// processor holding a `link: ChildLink` field.
macro_rules! forward_scope_to_link {
    () => {
        fn has(&self, name: &str) -> bool {
            self.link.has(name)
        }

        fn has_local(&self, name: &str) -> bool {
            self.link.has_local(name)
        }

        fn get(&self, name: &str) -> Option<&serde_json::Value> {
            self.link.get(name)
        }

        fn must_get(
            &self,
            name: &str,
        ) -> std::result::Result<&serde_json::Value, $crate::errors::MissingKeyError> {
            self.link.must_get(name)
        }

        fn set(&mut self, name: &str, value: serde_json::Value) -> Option<serde_json::Value> {
            self.link.set(name, value)
        }

        fn set_local(
            &mut self,
            name: &str,
            value: serde_json::Value,
        ) -> Option<serde_json::Value> {
            self.link.set_local(name, value)
        }

        fn unset(&mut self, name: &str) -> Option<serde_json::Value> {
            self.link.unset(name)
        }

        fn local_to_global(&mut self, name: &str) {
            self.link.local_to_global(name);
        }
    };
}

/// Implements the delegating [`Processor`] methods of a processor holding
/// a `link: ChildLink` field. `kind`, `run` and `as_chain` stay with the
/// variant.
macro_rules! forward_processor_to_link {
    () => {
        fn title(&self) -> &str {
            self.link.title()
        }

        fn depth(&self) -> usize {
            self.link.depth()
        }

        fn is_finished(&self) -> bool {
            self.link.is_finished()
        }

        fn aborted(&self) -> bool {
            self.link.aborted()
        }

        fn request_context(&self) -> &$crate::context::RequestContext {
            self.link.request_context()
        }

        fn abort(&mut self, code: u16, payload: Option<$crate::context::Payload>) {
            self.link.abort(code, payload);
        }

        fn answer(&mut self, code: u16) {
            self.link.answer(code);
        }

        fn answer_with_data(&mut self, code: u16, payload: Option<$crate::context::Payload>) {
            self.link.answer_with_data(code, payload);
        }

        fn response_code(&self) -> u16 {
            self.link.response_code()
        }

        fn response_payload(&self) -> Option<&$crate::context::Payload> {
            self.link.response_payload()
        }

        fn set_response_code(&mut self, code: u16) {
            self.link.set_response_code(code);
        }

        fn set_response_payload(&mut self, payload: Option<$crate::context::Payload>) {
            self.link.set_response_payload(payload);
        }

        fn set_response_payload_value(&mut self, name: &str, value: serde_json::Value) {
            self.link.set_response_payload_value(name, value);
        }
    };
}

pub(crate) use forward_processor_to_link;
pub(crate) use forward_scope_to_link;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{RootProcessor, VariableScope};
    use crate::testing::TestRequest;
    use serde_json::json;

    fn root() -> RootProcessor {
        RootProcessor::new("child", TestRequest::get("/").build(), 200, crate::pipeline::status_responder())
    }

    #[test]
    fn test_link_depth_and_title() {
        let mut root = root();
        let link = ChildLink::new(&mut root);
        assert_eq!(link.depth(), 1);
        assert_eq!(link.title(), "child");
        assert_eq!(link.parent().kind(), ProcessorKind::Root);
    }

    #[test]
    fn test_link_caches_request_context() {
        let mut root = root();
        let expected = root.request_context().clone();
        let link = ChildLink::new(&mut root);

        assert!(link.context.get().is_none());
        assert!(link.request_context().same_exchange(&expected));
        assert!(link.context.get().is_some());
    }

    #[test]
    fn test_link_unset_prefers_local() {
        let mut root = root();
        root.set("k", json!("global"));

        let mut link = ChildLink::new(&mut root);
        link.set_local("k", json!("local"));

        assert_eq!(link.unset("k"), Some(json!("local")));
        assert_eq!(link.get("k"), Some(&json!("global")));
        assert_eq!(link.unset("k"), Some(json!("global")));
        assert_eq!(link.unset("k"), None);
    }

    #[test]
    fn test_link_abort_finishes_both() {
        let mut root = root();
        {
            let mut link = ChildLink::new(&mut root);
            link.abort(503, None);
            assert!(link.is_finished());
            assert!(link.aborted());
        }
        assert!(root.is_finished());
        assert_eq!(root.response_code(), 503);
    }
}
