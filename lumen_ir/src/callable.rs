//! Callable handles.
//!
//! Every function the pipeline touches (original definitions, skeletons,
//! specialized replacements and trampolines) is reached through a
//! [`Callable`]. A callable carries a process-unique [`CallableId`], which is
//! what specialization keys and no-op detection compare.

use crate::value::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Call Errors
// =============================================================================

/// Errors raised while invoking a callable.
#[derive(Debug, Error)]
pub enum CallError {
    /// Wrong number of arguments.
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A referenced name has no binding.
    #[error("`{name}` is not defined")]
    Undefined { name: String },

    /// An operation received values of the wrong type.
    #[error("type error in `{op}`: {message}")]
    TypeMismatch { op: String, message: String },

    /// Execution failed for another reason.
    #[error("{0}")]
    Failed(String),

    /// A dispatch stub failed before it could invoke its target.
    #[error("{0}")]
    Dispatch(Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for call operations.
pub type CallResult<T> = Result<T, CallError>;

// =============================================================================
// Callable Identity
// =============================================================================

static NEXT_CALLABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallableId(u64);

impl CallableId {
    /// Allocate a fresh identity.
    pub fn fresh() -> Self {
        Self(NEXT_CALLABLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

// =============================================================================
// Function Trait
// =============================================================================

/// Something that can be invoked with concrete arguments.
pub trait Function: Send + Sync {
    /// Display name.
    fn name(&self) -> &str;

    /// Declared parameter count.
    fn arity(&self) -> usize;

    /// Invoke with arguments whose count already matches [`Function::arity`].
    fn invoke(&self, args: &[Value]) -> CallResult<Value>;
}

type NativeBody = dyn Fn(&[Value]) -> CallResult<Value> + Send + Sync;

/// Host function wrapped as a [`Function`].
struct NativeFunction {
    name: Arc<str>,
    arity: usize,
    body: Box<NativeBody>,
}

impl Function for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn invoke(&self, args: &[Value]) -> CallResult<Value> {
        (self.body)(args)
    }
}

// =============================================================================
// Callable
// =============================================================================

/// Cheap-clone handle to a function with a stable identity.
///
/// Equality is identity: two handles are equal iff they were cloned from
/// the same [`Callable::new`] call.
#[derive(Clone)]
pub struct Callable {
    id: CallableId,
    function: Arc<dyn Function>,
}

impl Callable {
    /// Wrap a function under a fresh identity.
    pub fn new(function: Arc<dyn Function>) -> Self {
        Self {
            id: CallableId::fresh(),
            function,
        }
    }

    /// Wrap a host closure.
    pub fn native<F>(name: &str, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> CallResult<Value> + Send + Sync + 'static,
    {
        Self::new(Arc::new(NativeFunction {
            name: Arc::from(name),
            arity,
            body: Box::new(body),
        }))
    }

    #[inline]
    pub fn id(&self) -> CallableId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.function.name()
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.function.arity()
    }

    /// Access the underlying function.
    #[inline]
    pub fn function(&self) -> &Arc<dyn Function> {
        &self.function
    }

    /// Invoke after checking the argument count.
    pub fn call(&self, args: &[Value]) -> CallResult<Value> {
        let expected = self.arity();
        if args.len() != expected {
            return Err(CallError::Arity {
                name: self.name().to_string(),
                expected,
                got: args.len(),
            });
        }
        self.function.invoke(args)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Callable {}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("arity", &self.arity())
            .finish()
    }
}
