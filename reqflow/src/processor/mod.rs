//! The processor hierarchy.
//!
//! A pipeline is a tree of processors rooted at a single [`RootProcessor`].
//! Handlers run inside a processor and may create nested
//! [`GroupProcessor`]s and [`ConditionalProcessor`]s on the fly; those borrow
//! their parent for the duration of their own `run` and are dropped
//! afterwards.
//!
//! Only the root owns response state and the global variable table. Every
//! other processor forwards response, abort and answer operations to its
//! parent, keeping only its own `finished` flag and local variables.

mod child;
mod conditional;
mod group;
mod root;

pub use child::ChildLink;
pub use conditional::ConditionalProcessor;
pub use group::GroupProcessor;
pub use root::RootProcessor;

use crate::context::{Payload, RequestContext};
use crate::errors::{MissingKeyError, ReqflowError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A unit of caller-supplied logic run inside a processor.
pub type Handler = Arc<dyn Fn(&mut dyn Processor, &RequestContext) + Send + Sync>;

/// A handler run inside a [`ConditionalProcessor`] (test or branch).
pub type BranchHandler =
    Arc<dyn Fn(&mut ConditionalProcessor<'_>, &RequestContext) + Send + Sync>;

/// Wraps a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut dyn Processor, &RequestContext) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`BranchHandler`].
pub fn branch<F>(f: F) -> BranchHandler
where
    F: Fn(&mut ConditionalProcessor<'_>, &RequestContext) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The variant of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    /// The unique top-level processor.
    Root,
    /// A nested handler chain.
    Group,
    /// A nested test-then-branch point.
    Conditional,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Group => write!(f, "group"),
            Self::Conditional => write!(f, "if"),
        }
    }
}

/// Variable access with local/global resolution.
///
/// Local variables live on the processor that wrote them. Global variables
/// always live on the root: non-root processors forward `set` to their
/// parent, so a global write lands on the root at any depth.
pub trait VariableScope {
    /// True if `name` resolves locally or in any ancestor.
    fn has(&self, name: &str) -> bool;

    /// True only if `name` is in this processor's own table.
    fn has_local(&self, name: &str) -> bool;

    /// Resolves `name`, local values shadowing ancestors.
    fn get(&self, name: &str) -> Option<&Value>;

    /// Resolves `name`, failing if it is absent from the whole chain.
    fn must_get(&self, name: &str) -> std::result::Result<&Value, MissingKeyError>;

    /// Writes a global variable, returning the previous value if it existed.
    fn set(&mut self, name: &str, value: Value) -> Option<Value>;

    /// Writes a local variable, returning the previous local value if it existed.
    fn set_local(&mut self, name: &str, value: Value) -> Option<Value>;

    /// Removes the nearest binding of `name`, returning it if it existed.
    fn unset(&mut self, name: &str) -> Option<Value>;

    /// Moves a local variable into the global scope.
    fn local_to_global(&mut self, name: &str);
}

/// Typed helpers over any [`VariableScope`].
pub trait VariableScopeExt: VariableScope {
    /// Resolves `name` and deserializes it.
    fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|value| {
                T::deserialize(value).map_err(|e| ReqflowError::type_mismatch(name, e.to_string()))
            })
            .transpose()
    }

    /// Resolves `name` and deserializes it, failing if absent.
    fn must_get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.must_get(name)?;
        T::deserialize(value).map_err(|e| ReqflowError::type_mismatch(name, e.to_string()))
    }
}

impl<S: VariableScope + ?Sized> VariableScopeExt for S {}

/// The capability set shared by every processor variant.
pub trait Processor: VariableScope {
    /// Returns the processor variant.
    fn kind(&self) -> ProcessorKind;

    /// Returns the pipeline title.
    fn title(&self) -> &str;

    /// Returns the nesting depth (root is 0).
    fn depth(&self) -> usize;

    /// True once this processor will never execute further work.
    fn is_finished(&self) -> bool;

    /// True if the pipeline ended through an abort.
    fn aborted(&self) -> bool;

    /// Executes the processor to completion.
    ///
    /// # Panics
    ///
    /// Panics if the processor has already finished.
    fn run(&mut self);

    /// Returns the request context of the pipeline.
    fn request_context(&self) -> &RequestContext;

    /// Finishes the pipeline with an error code and payload.
    fn abort(&mut self, code: u16, payload: Option<Payload>);

    /// Finishes the pipeline with a code.
    fn answer(&mut self, code: u16);

    /// Finishes the pipeline with a code and payload.
    fn answer_with_data(&mut self, code: u16, payload: Option<Payload>);

    /// Returns the current response code.
    fn response_code(&self) -> u16;

    /// Returns the current response payload.
    fn response_payload(&self) -> Option<&Payload>;

    /// Replaces the response code without finishing.
    fn set_response_code(&mut self, code: u16);

    /// Replaces the response payload.
    fn set_response_payload(&mut self, payload: Option<Payload>);

    /// Sets one entry of the response payload, allocating it if needed.
    fn set_response_payload_value(&mut self, name: &str, value: Value);

    /// Returns chain controls if this processor runs a handler chain.
    fn as_chain(&mut self) -> Option<&mut dyn ChainControl> {
        None
    }
}

/// Controls over a processor that walks a handler chain.
pub trait ChainControl: Processor {
    /// Skips the next handler without running it.
    fn skip_next(&mut self);

    /// Ends the chain; on the root this also realizes the response.
    fn skip_to_end(&mut self);

    /// Appends handlers to the end of the chain.
    fn extend_chain(&mut self, handlers: Vec<Handler>);

    /// Index of the handler currently being executed.
    fn position(&self) -> usize;

    /// Number of handlers in the chain.
    fn chain_len(&self) -> usize;
}
