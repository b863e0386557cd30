//! Level Conversion Engine.
//!
//! Moves fragments between IR levels by delegating to the [`Frontend`]:
//!
//! ```text
//!   callable ──fetch_at_level──▶ fragment @ L
//!   fragment @ A ──install into skeleton──▶ frontend analysis ──▶ fragment @ B
//! ```
//!
//! Surface IR is never regenerated: it must be supplied by the caller and
//! evaluated by the frontend before it can enter any later level.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::frontend::Frontend;
use log::trace;
use lumen_ir::{normalize_fragment, CallSignature, Callable, DepthFirst, Fragment, IrLevel, Traversal};
use std::sync::Arc;

// =============================================================================
// Level Converter
// =============================================================================

/// Converts fragments between levels through a frontend.
pub struct LevelConverter<T = DepthFirst> {
    frontend: Arc<dyn Frontend>,
    traversal: T,
    config: PipelineConfig,
}

impl LevelConverter<DepthFirst> {
    /// Create a converter using the stock depth-first traversal.
    pub fn new(frontend: Arc<dyn Frontend>, config: PipelineConfig) -> Self {
        Self::with_traversal(frontend, DepthFirst, config)
    }
}

impl<T: Traversal> LevelConverter<T> {
    /// Create a converter with a custom traversal capability.
    pub fn with_traversal(frontend: Arc<dyn Frontend>, traversal: T, config: PipelineConfig) -> Self {
        Self {
            frontend,
            traversal,
            config,
        }
    }

    #[inline]
    pub fn frontend(&self) -> &Arc<dyn Frontend> {
        &self.frontend
    }

    #[inline]
    pub fn traversal(&self) -> &T {
        &self.traversal
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// IR for `callable` specialized to `signature` at `level`.
    ///
    /// Fails with [`PipelineError::UnsupportedLevel`] for surface level and
    /// with [`PipelineError::FrontendMismatch`] unless the frontend returns
    /// exactly one function-body-shaped fragment.
    pub fn fetch_at_level(
        &self,
        callable: &Callable,
        signature: &CallSignature,
        level: IrLevel,
    ) -> PipelineResult<Fragment> {
        trace!("fetching `{}{}` at {} level", callable.name(), signature, level);
        let fragment = self.single_candidate(callable, signature, level)?;
        if !fragment.is_function_body() {
            return Err(PipelineError::FrontendMismatch {
                callable: callable.name().to_string(),
                signature: signature.clone(),
                level,
                reason: format!("expected a function body, got a {} node", fragment.body.kind()),
            });
        }
        Ok(fragment)
    }

    /// Convert `fragment` from `from` to `to`.
    ///
    /// The fragment is installed as the body of `skeleton` and the frontend
    /// re-runs the analysis for `to`. Equal levels return the fragment as is.
    pub fn convert(
        &self,
        fragment: Fragment,
        signature: &CallSignature,
        from: IrLevel,
        to: IrLevel,
        skeleton: &Callable,
    ) -> PipelineResult<Fragment> {
        if from == to {
            return Ok(fragment);
        }
        if from.is_surface() {
            return Err(PipelineError::IllegalConversion {
                callable: skeleton.name().to_string(),
                signature: signature.clone(),
                from,
                to,
            });
        }

        trace!(
            "converting `{}{}` from {} to {} level",
            skeleton.name(),
            signature,
            from,
            to
        );
        self.install(skeleton, fragment)?;

        let converted = self.single_candidate(skeleton, signature, to)?;
        if !converted.is_function_body() {
            return Err(PipelineError::MalformedResult {
                callable: skeleton.name().to_string(),
                signature: signature.clone(),
                level: to,
                found: converted.body.kind(),
            });
        }
        Ok(converted)
    }

    /// Canonicalize and install `fragment` as the body of `skeleton`.
    pub fn install(&self, skeleton: &Callable, fragment: Fragment) -> PipelineResult<()> {
        let fragment = self.canonicalize(fragment)?;
        self.frontend.install_body(skeleton, fragment)?;
        Ok(())
    }

    /// Apply label normalization when enabled.
    pub fn canonicalize(&self, fragment: Fragment) -> PipelineResult<Fragment> {
        if self.config.normalize_labels && fragment.is_function_body() {
            Ok(normalize_fragment(&self.traversal, fragment)?)
        } else {
            Ok(fragment)
        }
    }

    /// Fresh empty skeleton matching the arity of `signature`.
    pub fn skeleton_for(&self, callable: &Callable, signature: &CallSignature) -> PipelineResult<Callable> {
        let name = format!("{}{}", callable.name(), signature);
        Ok(self.frontend.skeleton(&name, signature.arity())?)
    }

    fn single_candidate(
        &self,
        callable: &Callable,
        signature: &CallSignature,
        level: IrLevel,
    ) -> PipelineResult<Fragment> {
        let mut candidates = match level {
            IrLevel::Surface => {
                return Err(PipelineError::UnsupportedLevel {
                    callable: callable.name().to_string(),
                    signature: signature.clone(),
                    level,
                })
            }
            IrLevel::Lowered => self.frontend.lowered_form(callable, signature)?,
            IrLevel::UntypedAnalyzed => self.frontend.analyzed_form(callable, signature, false)?,
            IrLevel::TypedOptimized => self.frontend.analyzed_form(callable, signature, true)?,
        };

        match candidates.len() {
            1 => Ok(candidates.remove(0)),
            n => Err(PipelineError::FrontendMismatch {
                callable: callable.name().to_string(),
                signature: signature.clone(),
                level,
                reason: format!("expected exactly one candidate, got {}", n),
            }),
        }
    }
}
