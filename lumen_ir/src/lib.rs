//! Intermediate representation for the lumen pass pipeline.
//!
//! This crate holds everything the pipeline needs to talk about programs
//! without knowing how they are compiled:
//! - **Levels**: the four ordered stages a fragment can be represented at
//! - **Nodes**: a closed sum type over the statement and expression kinds
//! - **Values and signatures**: runtime values and the concrete type tuples
//!   observed at call sites
//! - **Callables**: identity-carrying handles to invocable functions
//! - **Traversal**: a depth-first rewrite capability over nodes
//! - **Label normalization**: canonical jump-target numbering after rewrites

pub mod callable;
pub mod error;
pub mod labels;
pub mod level;
pub mod node;
pub mod traverse;
pub mod value;

pub use callable::{CallError, CallResult, Callable, CallableId, Function};
pub use error::{IrError, IrResult};
pub use labels::{normalize_fragment, normalize_labels, LabelMap};
pub use level::IrLevel;
pub use node::{Fragment, FunctionDef, LabelId, Node, Symbol};
pub use traverse::{Cursor, DepthFirst, Traversal, Visit};
pub use value::{CallSignature, TypeTag, Value};
