//! Test-then-branch points.

use super::child::{forward_processor_to_link, forward_scope_to_link};
use super::{BranchHandler, ChildLink, Handler, Processor, ProcessorKind, VariableScope};
use crate::errors::misuse_fault;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A nested branch point.
///
/// `run` hands control to the test handler, which decides the branch by
/// calling [`continue_true`](Self::continue_true) or
/// [`continue_false`](Self::continue_false), or skips branching altogether
/// by finishing the processor (for example through `abort`). The chosen
/// branch runs synchronously inside the test handler.
pub struct ConditionalProcessor<'p> {
    link: ChildLink<'p>,
    test: BranchHandler,
    on_true: BranchHandler,
    on_false: BranchHandler,
}

impl<'p> ConditionalProcessor<'p> {
    /// Creates a branch point under `parent`.
    pub fn new(
        parent: &'p mut dyn Processor,
        test: BranchHandler,
        on_true: BranchHandler,
        on_false: BranchHandler,
    ) -> Self {
        Self {
            link: ChildLink::new(parent),
            test,
            on_true,
            on_false,
        }
    }

    /// Sets a handler run before the test.
    #[must_use]
    pub fn with_initializer(mut self, initializer: Handler) -> Self {
        self.link.set_initializer(initializer);
        self
    }

    /// Sets a handler run after the test, unless the processor finished
    /// early or the pipeline was aborted.
    #[must_use]
    pub fn with_finalizer(mut self, finalizer: Handler) -> Self {
        self.link.set_finalizer(finalizer);
        self
    }

    /// Runs the true branch.
    ///
    /// # Panics
    ///
    /// Panics if the processor has already finished.
    pub fn continue_true(&mut self) {
        if self.link.is_finished() {
            misuse_fault(ProcessorKind::Conditional, "continue_true");
        }

        trace!(depth = self.depth(), "Taking true branch");
        let on_true = Arc::clone(&self.on_true);
        let ctx = self.request_context().clone();
        on_true(self, &ctx);
    }

    /// Runs the false branch.
    ///
    /// # Panics
    ///
    /// Panics if the processor has already finished.
    pub fn continue_false(&mut self) {
        if self.link.is_finished() {
            misuse_fault(ProcessorKind::Conditional, "continue_false");
        }

        trace!(depth = self.depth(), "Taking false branch");
        let on_false = Arc::clone(&self.on_false);
        let ctx = self.request_context().clone();
        on_false(self, &ctx);
    }

    /// Returns the delegation link.
    pub const fn link(&self) -> &ChildLink<'p> {
        &self.link
    }
}

impl fmt::Debug for ConditionalProcessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalProcessor")
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl VariableScope for ConditionalProcessor<'_> {
    forward_scope_to_link!();
}

impl Processor for ConditionalProcessor<'_> {
    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Conditional
    }

    fn run(&mut self) {
        if self.link.is_finished() {
            misuse_fault(ProcessorKind::Conditional, "run");
        }

        let depth = self.depth();
        let kind = self.kind();
        trace!(depth, kind = %kind, "Conditional started");

        let ctx = self.request_context().clone();
        if let Some(initializer) = self.link.initializer() {
            initializer(self, &ctx);
        }

        if !self.link.is_finished() {
            let test = Arc::clone(&self.test);
            test(self, &ctx);
        }

        if !self.link.is_finished() && !self.aborted() {
            if let Some(finalizer) = self.link.finalizer() {
                finalizer(self, &ctx);
            }
        }

        self.link.mark_finished();
        trace!(depth, kind = %kind, aborted = self.aborted(), "Conditional finished");
    }

    forward_processor_to_link!();
}
