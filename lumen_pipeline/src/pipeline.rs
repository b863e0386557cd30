//! Pass pipeline driver.
//!
//! Runs the non-surface passes of a [`PassSet`] over one callable and one
//! concrete signature:
//!
//! ```text
//!   callable ─▶ fetch @ L1 ─▶ pass1 ─▶ convert L1→L2 ─▶ pass2 ─▶ … ─▶ convert →Typed ─▶ install
//! ```
//!
//! Any pass may end the run early by returning a callable, or by abandoning
//! the attempt, in which case the caller keeps using the original callable.

use crate::config::PipelineConfig;
use crate::convert::LevelConverter;
use crate::error::{PipelineError, PipelineResult};
use crate::frontend::Frontend;
use crate::pass::{Pass, PassContext, PassOutput, PassSet};
use log::{debug, trace};
use lumen_ir::{CallSignature, Callable, DepthFirst, Fragment, IrLevel, Traversal};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Outcome
// =============================================================================

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// A callable specialized for the requested signature.
    Specialized(Callable),
    /// The passes produced nothing better than the original callable.
    NoImprovement,
}

impl PipelineOutcome {
    /// The specialized callable, if any.
    pub fn specialized(&self) -> Option<&Callable> {
        match self {
            Self::Specialized(callable) => Some(callable),
            Self::NoImprovement => None,
        }
    }
}

/// Outcome plus the statistics gathered while producing it.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    pub stats: PipelineStats,
}

// =============================================================================
// Statistics
// =============================================================================

/// Statistics from a single pass application.
#[derive(Debug, Clone)]
pub struct PassStat {
    /// Pass name.
    pub name: String,
    /// Level the pass ran at.
    pub level: IrLevel,
    /// Time spent in the pass. Zero unless timing is enabled.
    pub time: Duration,
}

/// Statistics from one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Passes applied.
    pub passes_run: usize,
    /// Surface passes skipped.
    pub passes_skipped: usize,
    /// Level conversions performed.
    pub conversions: usize,
    /// Per-pass details, in application order.
    pub passes: Vec<PassStat>,
    /// Wall time of the whole run. Zero unless timing is enabled.
    pub total_time: Duration,
}

impl PipelineStats {
    /// Time spent inside passes, excluding conversions.
    pub fn pass_time(&self) -> Duration {
        self.passes.iter().map(|p| p.time).sum()
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Working value threaded between passes.
enum Working {
    Callable(Callable),
    Fragment(Fragment),
}

/// Drives a pass set over a callable.
pub struct PassPipeline<T = DepthFirst> {
    converter: LevelConverter<T>,
    runs: AtomicU64,
}

impl PassPipeline<DepthFirst> {
    /// Create a pipeline over `frontend`.
    pub fn new(frontend: Arc<dyn Frontend>, config: PipelineConfig) -> Self {
        Self::from_converter(LevelConverter::new(frontend, config))
    }
}

impl<T: Traversal> PassPipeline<T> {
    pub fn from_converter(converter: LevelConverter<T>) -> Self {
        Self {
            converter,
            runs: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn converter(&self) -> &LevelConverter<T> {
        &self.converter
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        self.converter.config()
    }

    /// Number of runs started so far.
    #[inline]
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Run `pass_set` over `callable` specialized to `signature`.
    pub fn run(
        &self,
        callable: &Callable,
        signature: &CallSignature,
        pass_set: &PassSet,
    ) -> PipelineResult<PipelineRun> {
        let mut level = pass_set.first_level().ok_or(PipelineError::NoPassesRegistered)?;
        self.runs.fetch_add(1, Ordering::Relaxed);

        let timing = self.config().collect_timing;
        let start = timing.then(Instant::now);
        let mut stats = PipelineStats::default();

        debug!(
            "specializing `{}{}` with {} ({} passes)",
            callable.name(),
            signature,
            pass_set.id(),
            pass_set.len()
        );

        let mut current = Working::Callable(callable.clone());
        let mut scratch: Option<Callable> = None;

        for pass in pass_set {
            if pass.level().is_surface() {
                trace!("skipping surface pass `{}`", pass.name());
                stats.passes_skipped += 1;
                continue;
            }

            let fragment = match current {
                Working::Callable(target) => self.converter.fetch_at_level(&target, signature, pass.level())?,
                Working::Fragment(fragment) => {
                    if level != pass.level() {
                        stats.conversions += 1;
                    }
                    let skeleton = self.take_scratch(&mut scratch, callable, signature)?;
                    let converted = self
                        .converter
                        .convert(fragment, signature, level, pass.level(), &skeleton);
                    scratch = Some(skeleton);
                    converted?
                }
            };

            let cx = PassContext::specializing(callable, signature, pass.level());
            let output = self.apply(pass, &cx, fragment, timing, &mut stats)?;
            level = pass.level();

            match output {
                PassOutput::Fragment(fragment) => {
                    if !fragment.is_function_body() {
                        return Err(PipelineError::InvalidPassResult {
                            pass: pass.name().to_string(),
                            reason: format!("expected a function body, got a {} node", fragment.body.kind()),
                        });
                    }
                    current = Working::Fragment(fragment);
                }
                PassOutput::Callable(replacement) => {
                    if replacement.arity() != signature.arity() {
                        return Err(PipelineError::InvalidPassResult {
                            pass: pass.name().to_string(),
                            reason: format!(
                                "callable `{}` takes {} arguments, signature has {}",
                                replacement.name(),
                                replacement.arity(),
                                signature.arity()
                            ),
                        });
                    }
                    debug!("pass `{}` produced `{}`, ending pipeline", pass.name(), replacement.name());
                    current = Working::Callable(replacement);
                    break;
                }
                PassOutput::Abandon => {
                    debug!("pass `{}` abandoned `{}{}`", pass.name(), callable.name(), signature);
                    return Ok(self.finish(PipelineOutcome::NoImprovement, stats, start));
                }
            }
        }

        let outcome = match current {
            Working::Fragment(fragment) => {
                if level != IrLevel::TypedOptimized {
                    stats.conversions += 1;
                }
                let skeleton = self.take_scratch(&mut scratch, callable, signature)?;
                let typed = self
                    .converter
                    .convert(fragment, signature, level, IrLevel::TypedOptimized, &skeleton)?;

                let specialized = self.converter.skeleton_for(callable, signature)?;
                self.converter.install(&specialized, typed)?;
                PipelineOutcome::Specialized(specialized)
            }
            Working::Callable(result) if result == *callable => PipelineOutcome::NoImprovement,
            Working::Callable(result) => PipelineOutcome::Specialized(result),
        };

        Ok(self.finish(outcome, stats, start))
    }

    fn apply(
        &self,
        pass: &Pass,
        cx: &PassContext<'_>,
        fragment: Fragment,
        timing: bool,
        stats: &mut PipelineStats,
    ) -> PipelineResult<PassOutput> {
        trace!("running pass `{}` at {} level", pass.name(), pass.level());
        let start = timing.then(Instant::now);

        let output = pass
            .apply(cx, fragment)
            .map_err(|source| PipelineError::PassFailed {
                pass: pass.name().to_string(),
                source,
            })?;

        stats.passes_run += 1;
        stats.passes.push(PassStat {
            name: pass.name().to_string(),
            level: pass.level(),
            time: start.map(|s| s.elapsed()).unwrap_or_default(),
        });
        Ok(output)
    }

    /// Scratch skeleton used as the conversion target, created on first use.
    fn take_scratch(
        &self,
        scratch: &mut Option<Callable>,
        callable: &Callable,
        signature: &CallSignature,
    ) -> PipelineResult<Callable> {
        match scratch.take() {
            Some(skeleton) => Ok(skeleton),
            None => self.converter.skeleton_for(callable, signature),
        }
    }

    fn finish(&self, outcome: PipelineOutcome, mut stats: PipelineStats, start: Option<Instant>) -> PipelineRun {
        if let Some(start) = start {
            stats.total_time = start.elapsed();
        }
        PipelineRun { outcome, stats }
    }
}
