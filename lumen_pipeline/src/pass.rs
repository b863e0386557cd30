//! Passes and pass sets.
//!
//! A [`Pass`] pairs a transformation with the [`IrLevel`] it operates at.
//! A [`PassSet`] is an ordered, level-monotonic sequence of passes with its
//! own identity; specialization caches key on that identity, so every
//! change to a set produces a new [`PassSetId`].

use crate::error::{PipelineError, PipelineResult};
use lumen_ir::{CallSignature, Callable, Fragment, IrLevel, Symbol};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// Pass Context and Output
// =============================================================================

/// What a pass knows about the fragment it is transforming.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    /// Callable being specialized. `None` for surface passes, which run at
    /// annotation time before any callable exists.
    pub target: Option<&'a Callable>,
    /// Concrete signature being specialized for. `None` for surface passes.
    pub signature: Option<&'a CallSignature>,
    /// Level of the fragment handed to the pass.
    pub level: IrLevel,
}

impl<'a> PassContext<'a> {
    /// Context for a pass run at annotation time.
    pub fn surface() -> Self {
        Self {
            target: None,
            signature: None,
            level: IrLevel::Surface,
        }
    }

    /// Context for a pass run during specialization.
    pub fn specializing(target: &'a Callable, signature: &'a CallSignature, level: IrLevel) -> Self {
        Self {
            target: Some(target),
            signature: Some(signature),
            level,
        }
    }
}

/// Result of running a pass.
#[derive(Debug, Clone)]
pub enum PassOutput {
    /// Transformed fragment at the pass's level.
    Fragment(Fragment),
    /// Fully-formed replacement callable.
    ///
    /// Returning a callable ends the pipeline: the remaining passes of the
    /// set are not run and the callable becomes the specialization.
    Callable(Callable),
    /// Give up; the original callable is used unchanged.
    Abandon,
}

/// Failure reported by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PassError {
    message: String,
}

impl PassError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// =============================================================================
// Transform
// =============================================================================

/// A fragment transformation.
pub trait Transform: Send + Sync {
    fn apply(&self, cx: &PassContext<'_>, fragment: Fragment) -> Result<PassOutput, PassError>;
}

impl<F> Transform for F
where
    F: Fn(&PassContext<'_>, Fragment) -> Result<PassOutput, PassError> + Send + Sync,
{
    fn apply(&self, cx: &PassContext<'_>, fragment: Fragment) -> Result<PassOutput, PassError> {
        self(cx, fragment)
    }
}

// =============================================================================
// Pass
// =============================================================================

/// A transformation bound to an IR level.
#[derive(Clone)]
pub struct Pass {
    name: Symbol,
    level: IrLevel,
    transform: Arc<dyn Transform>,
}

impl Pass {
    /// Build a pass from a closure.
    pub fn new<F>(name: &str, level: IrLevel, transform: F) -> Self
    where
        F: Fn(&PassContext<'_>, Fragment) -> Result<PassOutput, PassError> + Send + Sync + 'static,
    {
        Self::with_transform(name, level, transform)
    }

    /// Build a pass from any [`Transform`].
    pub fn with_transform<T: Transform + 'static>(name: &str, level: IrLevel, transform: T) -> Self {
        Self {
            name: Arc::from(name),
            level,
            transform: Arc::new(transform),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn level(&self) -> IrLevel {
        self.level
    }

    /// Run the transformation.
    pub fn apply(&self, cx: &PassContext<'_>, fragment: Fragment) -> Result<PassOutput, PassError> {
        self.transform.apply(cx, fragment)
    }
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish()
    }
}

// =============================================================================
// Pass Set
// =============================================================================

static NEXT_PASS_SET_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a pass set snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassSetId(u64);

impl PassSetId {
    fn fresh() -> Self {
        Self(NEXT_PASS_SET_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PassSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "passes#{}", self.0)
    }
}

/// Ordered sequence of passes whose levels never decrease.
#[derive(Debug, Clone)]
pub struct PassSet {
    id: PassSetId,
    passes: Vec<Pass>,
}

impl PassSet {
    /// Empty set.
    pub fn empty() -> Self {
        Self {
            id: PassSetId::fresh(),
            passes: Vec::new(),
        }
    }

    /// Validate and build a set from passes in order.
    pub fn new<I: IntoIterator<Item = Pass>>(passes: I) -> PipelineResult<Self> {
        let passes: Vec<Pass> = passes.into_iter().collect();
        for pair in passes.windows(2) {
            check_order(pair[0].level(), &pair[1])?;
        }
        Ok(Self {
            id: PassSetId::fresh(),
            passes,
        })
    }

    /// New set with `pass` appended; `self` is unchanged.
    pub fn with_pass(&self, pass: Pass) -> PipelineResult<Self> {
        if let Some(last) = self.last_level() {
            check_order(last, &pass)?;
        }
        let mut passes = self.passes.clone();
        passes.push(pass);
        Ok(Self {
            id: PassSetId::fresh(),
            passes,
        })
    }

    #[inline]
    pub fn id(&self) -> PassSetId {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    #[inline]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pass> {
        self.passes.iter()
    }

    /// Level of the first pass.
    pub fn first_level(&self) -> Option<IrLevel> {
        self.passes.first().map(Pass::level)
    }

    /// Level of the last pass.
    pub fn last_level(&self) -> Option<IrLevel> {
        self.passes.last().map(Pass::level)
    }

    /// Check if every pass runs at surface level (vacuously false when empty).
    pub fn is_surface_only(&self) -> bool {
        !self.passes.is_empty() && self.passes.iter().all(|p| p.level().is_surface())
    }

    /// Passes that run at annotation time.
    pub fn surface_passes(&self) -> impl Iterator<Item = &Pass> {
        self.passes.iter().filter(|p| p.level().is_surface())
    }
}

impl<'a> IntoIterator for &'a PassSet {
    type Item = &'a Pass;
    type IntoIter = std::slice::Iter<'a, Pass>;

    fn into_iter(self) -> Self::IntoIter {
        self.passes.iter()
    }
}

fn check_order(previous: IrLevel, pass: &Pass) -> PipelineResult<()> {
    if pass.level() < previous {
        return Err(PipelineError::OrderingViolation {
            pass: pass.name().to_string(),
            level: pass.level(),
            previous,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str, level: IrLevel) -> Pass {
        Pass::new(name, level, |_, f| Ok(PassOutput::Fragment(f)))
    }

    #[test]
    fn test_monotonic_set_is_accepted() {
        let set = PassSet::new([
            identity("a", IrLevel::Surface),
            identity("b", IrLevel::Lowered),
            identity("c", IrLevel::Lowered),
            identity("d", IrLevel::TypedOptimized),
        ])
        .unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.first_level(), Some(IrLevel::Surface));
        assert_eq!(set.last_level(), Some(IrLevel::TypedOptimized));
    }

    #[test]
    fn test_decreasing_set_is_rejected() {
        let err = PassSet::new([
            identity("typed", IrLevel::TypedOptimized),
            identity("untyped", IrLevel::UntypedAnalyzed),
        ])
        .unwrap_err();

        match err {
            PipelineError::OrderingViolation {
                pass,
                level,
                previous,
            } => {
                assert_eq!(pass, "untyped");
                assert_eq!(level, IrLevel::UntypedAnalyzed);
                assert_eq!(previous, IrLevel::TypedOptimized);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_with_pass_creates_new_identity() {
        let set = PassSet::new([identity("a", IrLevel::Lowered)]).unwrap();
        let extended = set.with_pass(identity("b", IrLevel::UntypedAnalyzed)).unwrap();
        assert_ne!(set.id(), extended.id());
        assert_eq!(set.len(), 1);
        assert_eq!(extended.len(), 2);

        assert!(extended.with_pass(identity("c", IrLevel::Surface)).is_err());
    }

    #[test]
    fn test_surface_only() {
        assert!(!PassSet::empty().is_surface_only());
        let surface = PassSet::new([identity("s", IrLevel::Surface)]).unwrap();
        assert!(surface.is_surface_only());
        let mixed = surface.with_pass(identity("l", IrLevel::Lowered)).unwrap();
        assert!(!mixed.is_surface_only());
        assert_eq!(mixed.surface_passes().count(), 1);
    }
}
