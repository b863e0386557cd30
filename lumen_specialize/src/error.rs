//! Dispatch and annotation errors.

use lumen_ir::CallError;
use lumen_pipeline::{FrontendError, PipelineError};
use thiserror::Error;

/// Errors raised by trampolines and the annotation entry points.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Specialization failed; nothing was cached.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// A trampoline was called with the wrong number of arguments.
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// The resolved callable failed.
    #[error(transparent)]
    Call(#[from] CallError),

    /// A call site names a callee with no binding.
    #[error("call-site callee `{name}` is not defined")]
    UnresolvedCallee { name: String },

    #[error(transparent)]
    Frontend(#[from] FrontendError),
}

/// Result type for dispatch and annotation.
pub type DispatchResult<T> = Result<T, DispatchError>;
