//! Nested handler chains.

use super::child::{forward_processor_to_link, forward_scope_to_link};
use super::{ChainControl, ChildLink, Handler, Processor, ProcessorKind, VariableScope};
use crate::errors::misuse_fault;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A nested, ordered chain of handlers.
///
/// A group runs its own chain like the root does, but owns no response
/// state: `skip_to_end` only ends the local chain. Answer and abort calls are
/// forwarded to the parent and finish the group as well.
pub struct GroupProcessor<'p> {
    link: ChildLink<'p>,
    chain: Vec<Handler>,
    cursor: usize,
}

impl<'p> GroupProcessor<'p> {
    /// Creates an empty group under `parent`.
    pub fn new(parent: &'p mut dyn Processor) -> Self {
        Self {
            link: ChildLink::new(parent),
            chain: Vec::new(),
            cursor: 0,
        }
    }

    /// Sets a handler run before the chain.
    #[must_use]
    pub fn with_initializer(mut self, initializer: Handler) -> Self {
        self.link.set_initializer(initializer);
        self
    }

    /// Sets a handler run after the chain, unless the group finished early
    /// or the pipeline was aborted.
    #[must_use]
    pub fn with_finalizer(mut self, finalizer: Handler) -> Self {
        self.link.set_finalizer(finalizer);
        self
    }

    /// Appends handlers to the chain.
    pub fn append(&mut self, handlers: impl IntoIterator<Item = Handler>) -> &mut Self {
        self.chain.extend(handlers);
        self
    }

    /// Appends a single handler to the chain.
    pub fn then(&mut self, handler: Handler) -> &mut Self {
        self.chain.push(handler);
        self
    }

    /// Returns the delegation link.
    pub const fn link(&self) -> &ChildLink<'p> {
        &self.link
    }
}

impl fmt::Debug for GroupProcessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupProcessor")
            .field("link", &self.link)
            .field("cursor", &self.cursor)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}

impl VariableScope for GroupProcessor<'_> {
    forward_scope_to_link!();
}

impl Processor for GroupProcessor<'_> {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Group
    }

    fn run(&mut self) {
        if self.link.is_finished() {
            misuse_fault(ProcessorKind::Group, "run");
        }

        let depth = self.depth();
        let kind = self.kind();
        trace!(depth, kind = %kind, handlers = self.chain.len(), "Group started");

        let ctx = self.request_context().clone();
        if let Some(initializer) = self.link.initializer() {
            initializer(self, &ctx);
        }

        while !self.link.is_finished() && self.cursor < self.chain.len() {
            let handler = Arc::clone(&self.chain[self.cursor]);
            trace!(index = self.cursor, depth, "Running group handler");
            handler(self, &ctx);
            self.cursor += 1;
        }

        if !self.link.is_finished() && !self.aborted() {
            if let Some(finalizer) = self.link.finalizer() {
                finalizer(self, &ctx);
            }
        }

        self.link.mark_finished();
        trace!(depth, kind = %kind, aborted = self.aborted(), "Group finished");
    }

    fn as_chain(&mut self) -> Option<&mut dyn ChainControl> {
        Some(self)
    }

    forward_processor_to_link!();
}

impl ChainControl for GroupProcessor<'_> {
    fn skip_next(&mut self) {
        self.cursor += 1;
    }

    fn skip_to_end(&mut self) {
        self.cursor = self.chain.len();
        self.link.mark_finished();
    }

    fn extend_chain(&mut self, handlers: Vec<Handler>) {
        self.chain.extend(handlers);
    }

    fn position(&self) -> usize {
        self.cursor
    }

    fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{handler, RootProcessor};
    use crate::testing::{CallLog, RecordingResponder, TestRequest};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn new_root(responder: &RecordingResponder) -> RootProcessor {
        RootProcessor::new("group-test", TestRequest::get("/").build(), 200, responder.handler())
    }

    #[test]
    fn test_initializer_chain_finalizer_order() {
        let log = CallLog::new();
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);

        let mut group = GroupProcessor::new(&mut root)
            .with_initializer(log.recorder("init"))
            .with_finalizer(log.recorder("fini"));
        group.append([log.recorder("a"), log.recorder("b")]);
        group.run();

        assert!(group.is_finished());
        assert_eq!(log.entries(), vec!["init", "a", "b", "fini"]);
        drop(group);

        assert!(!root.is_finished());
        assert_eq!(responder.calls(), 0);
    }

    #[test]
    fn test_skip_to_end_is_local() {
        let log = CallLog::new();
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);

        let mut group = GroupProcessor::new(&mut root).with_finalizer(log.recorder("fini"));
        group.append([
            log.recorder("a"),
            handler(|p, _| {
                if let Some(chain) = p.as_chain() {
                    chain.skip_to_end();
                }
            }),
            log.recorder("never"),
        ]);
        group.run();
        drop(group);

        assert_eq!(log.entries(), vec!["a"]);
        assert!(!root.is_finished());
        assert_eq!(responder.calls(), 0);
    }

    #[test]
    fn test_answer_finishes_group_and_root() {
        let log = CallLog::new();
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);

        let mut group = GroupProcessor::new(&mut root).with_finalizer(log.recorder("fini"));
        group.append([handler(|p, _| p.answer(202)), log.recorder("never")]);
        group.run();
        drop(group);

        assert!(log.entries().is_empty());
        assert!(root.is_finished());
        assert!(!root.aborted());
        assert_eq!(root.response_code(), 202);
    }

    #[test]
    fn test_skip_next_skips_one_group_handler() {
        let log = CallLog::new();
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);

        let mut group = GroupProcessor::new(&mut root).with_finalizer(log.recorder("fini"));
        group.append([
            handler(|p, _| {
                if let Some(chain) = p.as_chain() {
                    chain.skip_next();
                }
            }),
            log.recorder("skipped"),
            log.recorder("after"),
        ]);
        group.run();

        assert!(group.is_finished());
        assert_eq!(group.position(), 3);
        assert_eq!(log.entries(), vec!["after", "fini"]);
        drop(group);

        assert!(!root.is_finished());
    }

    #[test]
    fn test_locals_stay_in_group() {
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        root.set("shared", json!("root"));

        let mut group = GroupProcessor::new(&mut root);
        group.set_local("scratch", json!(1));
        group.set("result", json!(2));

        assert!(group.has_local("scratch"));
        assert!(!group.has_local("shared"));
        assert!(group.has("shared"));
        assert_eq!(group.get("result"), Some(&json!(2)));
        assert_eq!(group.link().locals().len(), 1);
        drop(group);

        assert!(!root.has("scratch"));
        assert_eq!(root.get("result"), Some(&json!(2)));
    }

    #[test]
    fn test_extend_chain_while_running() {
        let log = CallLog::new();
        let late = log.recorder("late");
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);

        let mut group = GroupProcessor::new(&mut root);
        group.then(handler(move |p, _| {
            if let Some(chain) = p.as_chain() {
                chain.extend_chain(vec![late.clone()]);
            }
        }));
        group.run();

        assert_eq!(log.entries(), vec!["late"]);
        assert_eq!(group.chain_len(), 2);
    }

    #[test]
    #[should_panic(expected = "ERROR [ group ] run called after end of request processing")]
    fn test_run_twice_faults() {
        let responder = RecordingResponder::new();
        let mut root = new_root(&responder);
        let mut group = GroupProcessor::new(&mut root);
        group.run();
        group.run();
    }
}
