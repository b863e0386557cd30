//! Pipeline configuration.
//!
//! Resolved once when an optimizer is created; the pipeline reads it
//! without further lookups.

use log::warn;

/// Disable label normalization with `LUMEN_NORMALIZE_LABELS=0`.
pub const ENV_NORMALIZE_LABELS: &str = "LUMEN_NORMALIZE_LABELS";
/// Enable per-pass timing with `LUMEN_PASS_TIMING=1`.
pub const ENV_PASS_TIMING: &str = "LUMEN_PASS_TIMING";

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Configuration for level conversion and pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Canonicalize jump targets before installing a fragment into a skeleton.
    pub normalize_labels: bool,

    /// Record per-pass wall time in [`crate::PipelineStats`].
    pub collect_timing: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            normalize_labels: true,
            collect_timing: false,
        }
    }
}

impl PipelineConfig {
    /// Configuration that records timing for every pass.
    pub fn profiling() -> Self {
        Self {
            collect_timing: true,
            ..Default::default()
        }
    }

    /// Default configuration overridden by environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Default configuration overridden through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(flag) = env_flag(&lookup, ENV_NORMALIZE_LABELS) {
            config.normalize_labels = flag;
        }
        if let Some(flag) = env_flag(&lookup, ENV_PASS_TIMING) {
            config.collect_timing = flag;
        }
        config
    }
}

fn env_flag<F>(lookup: &F, name: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match parse_flag(&raw) {
        Some(flag) => Some(flag),
        None => {
            warn!("ignoring {}={:?}: expected 1/0, true/false or on/off", name, raw);
            None
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
