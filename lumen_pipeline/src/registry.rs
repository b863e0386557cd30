//! Pass Pipeline Registry.
//!
//! Holds the global pass set as an explicit value. The set is stored as an
//! immutable snapshot: registration swaps in a new [`PassSet`] with a new
//! identity, so trampolines that resolved the old snapshot keep using it.

use crate::error::{PipelineError, PipelineResult};
use crate::pass::{Pass, PassSet};
use log::debug;
use std::sync::Arc;

// =============================================================================
// Pass Registry
// =============================================================================

/// The global, level-monotonic pass set.
#[derive(Debug, Clone)]
pub struct PassRegistry {
    current: Arc<PassSet>,
}

impl PassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            current: Arc::new(PassSet::empty()),
        }
    }

    /// Append a pass to the global set.
    ///
    /// Fails with [`PipelineError::OrderingViolation`] when `pass` operates
    /// below the level of the last registered pass; the set is unchanged.
    pub fn register(&mut self, pass: Pass) -> PipelineResult<()> {
        let next = self.current.with_pass(pass)?;
        if let Some(pass) = next.passes().last() {
            debug!(
                "registered pass `{}` at {} level ({} total)",
                pass.name(),
                pass.level(),
                next.len()
            );
        }
        self.current = Arc::new(next);
        Ok(())
    }

    /// Replace the global set with `passes`, registered in order.
    ///
    /// The whole sequence is validated before anything changes, so a failed
    /// call leaves the previous set in place.
    pub fn set_default_pass_set<I: IntoIterator<Item = Pass>>(&mut self, passes: I) -> PipelineResult<()> {
        let next = PassSet::new(passes)?;
        debug!("default pass set replaced ({} passes)", next.len());
        self.current = Arc::new(next);
        Ok(())
    }

    /// Current global set.
    #[inline]
    pub fn current(&self) -> Arc<PassSet> {
        Arc::clone(&self.current)
    }

    /// Pick the pass set an optimization should use.
    ///
    /// A non-empty `explicit` set wins; otherwise the global set is used.
    /// Fails with [`PipelineError::NoPassesRegistered`] when both are empty.
    pub fn resolve_effective_pass_set(&self, explicit: Option<&Arc<PassSet>>) -> PipelineResult<Arc<PassSet>> {
        match explicit {
            Some(set) if !set.is_empty() => Ok(Arc::clone(set)),
            _ if !self.current.is_empty() => Ok(self.current()),
            _ => Err(PipelineError::NoPassesRegistered),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.current.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Drop every registered pass.
    pub fn reset(&mut self) {
        self.current = Arc::new(PassSet::empty());
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
