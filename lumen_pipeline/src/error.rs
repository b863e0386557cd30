//! Pipeline errors.
//!
//! None of these are recovered locally: each aborts the current
//! optimization attempt and propagates to whoever started it.

use crate::frontend::FrontendError;
use crate::pass::PassError;
use lumen_ir::{CallSignature, IrError, IrLevel};
use thiserror::Error;

/// Errors raised by the registry, the level conversion engine and the
/// pipeline driver.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A pass was added below the level of the pass before it.
    #[error("pass `{pass}` at {level} level cannot follow a pass at {previous} level")]
    OrderingViolation {
        pass: String,
        level: IrLevel,
        previous: IrLevel,
    },

    /// Neither an explicit nor a global pass set is available.
    #[error("no optimization passes registered")]
    NoPassesRegistered,

    /// The requested level cannot be regenerated from a callable.
    #[error("cannot fetch `{callable}{signature}` at {level} level")]
    UnsupportedLevel {
        callable: String,
        signature: CallSignature,
        level: IrLevel,
    },

    /// Conversion between these levels is never performed automatically.
    #[error("cannot convert `{callable}{signature}` from {from} to {to} level")]
    IllegalConversion {
        callable: String,
        signature: CallSignature,
        from: IrLevel,
        to: IrLevel,
    },

    /// A conversion produced something that is not a function body.
    #[error("converting `{callable}{signature}` to {level} level produced a {found} node")]
    MalformedResult {
        callable: String,
        signature: CallSignature,
        level: IrLevel,
        found: &'static str,
    },

    /// The frontend did not produce exactly one usable fragment.
    #[error("frontend mismatch for `{callable}{signature}` at {level} level: {reason}")]
    FrontendMismatch {
        callable: String,
        signature: CallSignature,
        level: IrLevel,
        reason: String,
    },

    /// A pass produced output the pipeline cannot continue with.
    #[error("pass `{pass}` returned an unusable result: {reason}")]
    InvalidPassResult { pass: String, reason: String },

    /// A pass reported failure.
    #[error("pass `{pass}` failed")]
    PassFailed {
        pass: String,
        #[source]
        source: PassError,
    },

    #[error(transparent)]
    Frontend(#[from] FrontendError),

    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
