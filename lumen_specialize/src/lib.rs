//! Call-signature specialization for lumen.
//!
//! Annotated functions are replaced by a [`Trampoline`]: a dispatch stub
//! that, on every call, looks up the argument signature in the
//! [`SpecializationCache`], runs the pass pipeline on a miss, and invokes
//! the specialized callable (or the original one when the passes found no
//! improvement).
//!
//! ```text
//!   call f(args) ─▶ trampoline ─▶ cache[(f, sig, passes)] ─hit─▶ specialized(args)
//!                                        │ miss
//!                                        ▼
//!                                   pass pipeline ─▶ insert ─▶ specialized(args)
//! ```
//!
//! The [`Optimizer`] owns everything: frontend, pass registry, pipeline and
//! cache. Hosts that want a process-wide instance install one with
//! [`install_global`].

pub mod annotate;
pub mod cache;
pub mod error;
pub mod optimizer;
pub mod trampoline;

pub use annotate::Annotated;
pub use cache::{CacheStats, Resolution, SpecializationCache, SpecializationKey};
pub use error::{DispatchError, DispatchResult};
pub use optimizer::{global, install_global, Optimizer};
pub use trampoline::{DispatchStats, Trampoline};
