//! Reference frontend for the lumen pass pipeline.
//!
//! A small tree-walking interpreter over the IR that implements
//! [`lumen_pipeline::Frontend`]. Embedders without a compiler of their own
//! can use it directly; the pipeline tests and benches use it as the
//! collaborator that produces IR at each level.
//!
//! - **Builtins**: `+ - * < == !` over runtime values
//! - **Namespace**: concurrent name → callable bindings
//! - **Interpreter**: executes statement sequences with label jumps
//! - **Lowering**: surface definitions to argument-indexed bodies
//! - **Folding**: constant folding for the optimizing analysis

pub mod builtins;
pub mod fold;
pub mod frontend;
pub mod function;
pub mod interpreter;
pub mod lower;
pub mod namespace;

pub use frontend::ReferenceFrontend;
pub use function::InterpretedFunction;
pub use interpreter::Frame;
pub use namespace::Namespace;
