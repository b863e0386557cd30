//! IR representation levels.

use std::fmt;

// =============================================================================
// IR Level
// =============================================================================

/// Stage at which a fragment is represented.
///
/// Levels are totally ordered; a pass set is only valid when the levels of
/// its passes never decrease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IrLevel {
    /// Surface syntax, before macro expansion and desugaring.
    Surface,
    /// Desugared, lowered statement sequence.
    Lowered,
    /// Analyzed by the frontend without optimization.
    UntypedAnalyzed,
    /// Fully inferred and optimized by the frontend.
    TypedOptimized,
}

impl IrLevel {
    /// All levels in ascending order.
    pub const ALL: [IrLevel; 4] = [
        IrLevel::Surface,
        IrLevel::Lowered,
        IrLevel::UntypedAnalyzed,
        IrLevel::TypedOptimized,
    ];

    /// Check if this is the surface level.
    #[inline]
    pub fn is_surface(self) -> bool {
        self == IrLevel::Surface
    }

    /// Check if the frontend can regenerate this level from a callable.
    #[inline]
    pub fn is_derivable(self) -> bool {
        !self.is_surface()
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            IrLevel::Surface => "surface",
            IrLevel::Lowered => "lowered",
            IrLevel::UntypedAnalyzed => "untyped",
            IrLevel::TypedOptimized => "typed",
        }
    }
}

impl fmt::Display for IrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
