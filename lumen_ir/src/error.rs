//! IR-level errors.

use crate::node::LabelId;
use thiserror::Error;

/// Errors raised while manipulating IR fragments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IrError {
    /// A jump refers to a label that is never defined in the body.
    #[error("jump to undefined label {label}")]
    UndefinedLabel { label: LabelId },

    /// The same label is defined at two non-adjacent positions.
    #[error("label {label} is defined more than once")]
    DuplicateLabel { label: LabelId },
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
