//! Frontend capability.
//!
//! The pipeline never infers types or generates code. Whatever compiles the
//! host language implements [`Frontend`] so the pipeline can ask it for IR at
//! a level, create empty skeleton callables, and install new bodies.

use lumen_ir::{CallSignature, Callable, Fragment, FunctionDef};
use thiserror::Error;

/// Errors reported by a frontend implementation.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// The frontend holds no IR for this callable (host builtin, foreign stub).
    #[error("no IR available for `{name}`")]
    NoSource { name: String },

    /// The callable was not created by this frontend.
    #[error("`{name}` was not created by this frontend")]
    ForeignCallable { name: String },

    /// A surface definition could not be evaluated.
    #[error("cannot define `{name}`: {message}")]
    Definition { name: String, message: String },

    /// Any other frontend failure.
    #[error("{0}")]
    Other(String),
}

/// Produces and consumes IR on behalf of the pipeline.
pub trait Frontend: Send + Sync {
    /// Lowered form of `callable` for `signature`.
    ///
    /// Returns every candidate body; the pipeline requires exactly one.
    fn lowered_form(
        &self,
        callable: &Callable,
        signature: &CallSignature,
    ) -> Result<Vec<Fragment>, FrontendError>;

    /// Analyzed form of `callable` for `signature`.
    ///
    /// With `optimize == false` this is the untyped analysis; with `true` the
    /// fully inferred and optimized one.
    fn analyzed_form(
        &self,
        callable: &Callable,
        signature: &CallSignature,
        optimize: bool,
    ) -> Result<Vec<Fragment>, FrontendError>;

    /// Create an empty placeholder callable with the given arity.
    fn skeleton(&self, name: &str, arity: usize) -> Result<Callable, FrontendError>;

    /// Replace the body of a skeleton created by [`Frontend::skeleton`].
    fn install_body(&self, skeleton: &Callable, fragment: Fragment) -> Result<(), FrontendError>;

    /// Compile a surface definition into a callable, without binding it.
    fn evaluate_definition(&self, def: &FunctionDef) -> Result<Callable, FrontendError>;

    /// Bind `callable` under `name` in the frontend's namespace.
    fn bind(&self, name: &str, callable: Callable) -> Result<(), FrontendError>;

    /// Look up the callable bound under `name`.
    fn resolve(&self, name: &str) -> Option<Callable>;

    /// Check whether IR can be produced for `callable`.
    fn has_source(&self, _callable: &Callable) -> bool {
        true
    }
}
