//! Dispatch trampolines.
//!
//! A [`Trampoline`] stands in for a callable. Each call computes the
//! argument signature, resolves it through the shared
//! [`SpecializationCache`] and forwards the arguments to the result. The
//! pass set is fixed when the trampoline is built; later registry changes
//! do not affect it.

use crate::cache::{Resolution, SpecializationCache, SpecializationKey};
use crate::error::{DispatchError, DispatchResult};
use log::trace;
use lumen_ir::{CallError, CallResult, CallSignature, Callable, Function, Symbol, Value};
use lumen_pipeline::{PassPipeline, PassSet, PipelineOutcome};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// =============================================================================
// Trampoline
// =============================================================================

/// Signature-dispatching stand-in for a callable.
pub struct Trampoline {
    name: Symbol,
    target: Callable,
    pass_set: Arc<PassSet>,
    pipeline: Arc<PassPipeline>,
    cache: Arc<SpecializationCache>,
    calls: AtomicU64,
    specialized_calls: AtomicU64,
    fallback_calls: AtomicU64,
}

impl std::fmt::Debug for Trampoline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trampoline")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("pass_set", &self.pass_set)
            .finish_non_exhaustive()
    }
}

impl Trampoline {
    pub fn new(
        name: &str,
        target: Callable,
        pass_set: Arc<PassSet>,
        pipeline: Arc<PassPipeline>,
        cache: Arc<SpecializationCache>,
    ) -> Self {
        Self {
            name: Symbol::from(name),
            target,
            pass_set,
            pipeline,
            cache,
            calls: AtomicU64::new(0),
            specialized_calls: AtomicU64::new(0),
            fallback_calls: AtomicU64::new(0),
        }
    }

    /// Wrap into a callable with a fresh identity.
    pub fn into_callable(self) -> Callable {
        Callable::new(Arc::new(self))
    }

    /// Callable being specialized.
    #[inline]
    pub fn target(&self) -> &Callable {
        &self.target
    }

    /// Pass set captured at construction.
    #[inline]
    pub fn pass_set(&self) -> &Arc<PassSet> {
        &self.pass_set
    }

    /// Resolution for `signature`, running the pipeline on a cache miss.
    pub fn resolve(&self, signature: &CallSignature) -> DispatchResult<Resolution> {
        let key = SpecializationKey::new(&self.target, signature.clone(), &self.pass_set);
        self.cache.get_or_resolve(&key, || {
            let run = self.pipeline.run(&self.target, signature, &self.pass_set)?;
            Ok(match run.outcome {
                PipelineOutcome::Specialized(callable) => Resolution::Specialized(callable),
                PipelineOutcome::NoImprovement => Resolution::Fallback(self.target.clone()),
            })
        })
    }

    /// Resolve the signature of `args` and invoke the result.
    pub fn dispatch(&self, args: &[Value]) -> DispatchResult<Value> {
        let expected = self.target.arity();
        if args.len() != expected {
            return Err(DispatchError::ArityMismatch {
                name: self.name.to_string(),
                expected,
                got: args.len(),
            });
        }

        self.calls.fetch_add(1, Ordering::Relaxed);
        let signature = CallSignature::of(args);
        let resolution = self.resolve(&signature)?;

        if resolution.is_specialized() {
            self.specialized_calls.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fallback_calls.fetch_add(1, Ordering::Relaxed);
        }
        trace!("`{}{}` dispatching to `{}`", self.name, signature, resolution.callable().name());

        Ok(resolution.callable().call(args)?)
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            calls: self.calls.load(Ordering::Relaxed),
            specialized_calls: self.specialized_calls.load(Ordering::Relaxed),
            fallback_calls: self.fallback_calls.load(Ordering::Relaxed),
        }
    }
}

impl Function for Trampoline {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> usize {
        self.target.arity()
    }

    fn invoke(&self, args: &[Value]) -> CallResult<Value> {
        self.dispatch(args).map_err(|err| match err {
            DispatchError::Call(err) => err,
            other => CallError::Dispatch(Box::new(other)),
        })
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Per-trampoline call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Calls that reached resolution.
    pub calls: u64,
    /// Calls forwarded to a specialized callable.
    pub specialized_calls: u64,
    /// Calls forwarded to the original callable.
    pub fallback_calls: u64,
}

impl DispatchStats {
    /// Fraction of calls that ran specialized code.
    pub fn specialization_rate(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.specialized_calls as f64 / self.calls as f64
        }
    }
}
