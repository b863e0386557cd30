//! Pass pipeline for lumen.
//!
//! - **Passes**: transformations bound to the IR level they operate at
//! - **Registry**: the level-monotonic global pass set
//! - **Frontend**: the external capability that produces and consumes IR
//! - **Level conversion**: moves fragments between levels via the frontend
//! - **Pipeline**: runs a pass set over one callable and signature

pub mod config;
pub mod convert;
pub mod error;
pub mod frontend;
pub mod pass;
pub mod pipeline;
pub mod registry;

#[cfg(test)]
mod test_support;

pub use config::PipelineConfig;
pub use convert::LevelConverter;
pub use error::{PipelineError, PipelineResult};
pub use frontend::{Frontend, FrontendError};
pub use pass::{Pass, PassContext, PassError, PassOutput, PassSet, PassSetId, Transform};
pub use pipeline::{PassPipeline, PassStat, PipelineOutcome, PipelineRun, PipelineStats};
pub use registry::PassRegistry;
