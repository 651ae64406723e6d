//! Analysis parameters and their metadata
//!
//! This module carries the tunable knobs of the engine along with metadata
//! about each parameter, enabling:
//! - Grid search over parameter values
//! - Parameter documentation
//! - Automatic configuration UI generation
//!
//! # Example
//!
//! ```rust
//! use strata::params::AnalysisParams;
//!
//! for param in AnalysisParams::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{Percent, Period, Result, StructureError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Percentage as a fraction of one (0.02 == 2%)
    Percent,
    /// Bar-count period (positive integer)
    Period,
    /// Plain count (positive integer)
    Count,
}

/// Metadata for a single analysis parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    /// Parameter name (e.g., "merge_threshold")
    pub name: &'static str,
    /// Parameter type
    pub param_type: ParamType,
    /// Default value
    pub default: f64,
    /// Range for optimization: (min, max, step)
    pub range: (f64, f64, f64),
    /// Human-readable description
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn percent(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Percent,
            default,
            range,
            description,
        }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Period,
            default,
            range,
            description,
        }
    }

    pub const fn count(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self {
            name,
            param_type: ParamType::Count,
            default,
            range,
            description,
        }
    }

    /// Generate all values for grid search
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        let mut values = Vec::new();
        let mut v = min;
        while v <= max + f64::EPSILON {
            values.push(v);
            v += step;
        }
        values
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: f64) -> Result<()> {
        let (min, max, _) = self.range;
        if value < min || value > max {
            return Err(StructureError::OutOfRange {
                field: self.name,
                value,
                min,
                max,
            });
        }
        match self.param_type {
            ParamType::Percent => Ok(()),
            ParamType::Period | ParamType::Count => {
                if value < 1.0 || value.fract() != 0.0 {
                    return Err(StructureError::InvalidValue(
                        "integer parameter must be a positive whole number",
                    ));
                }
                Ok(())
            }
        }
    }
}

// ============================================================
// ANALYSIS PARAMETERS
// ============================================================

/// Fixed tolerance used when recounting level touches against the raw
/// low/high series.
pub const RECOUNT_TOLERANCE: f64 = 0.01;

static PARAM_META: [ParamMeta; 5] = [
    ParamMeta::period(
        "lookback_period",
        100.0,
        (20.0, 250.0, 10.0),
        "Number of recent bars the analysis window covers",
    ),
    ParamMeta::period(
        "pivot_window",
        5.0,
        (2.0, 10.0, 1.0),
        "Symmetric bar window for local extremum detection",
    ),
    ParamMeta::percent(
        "merge_threshold",
        0.02,
        (0.005, 0.05, 0.005),
        "Relative gap within which nearby pivot levels merge",
    ),
    ParamMeta::count(
        "min_touches",
        2.0,
        (1.0, 5.0, 1.0),
        "Minimum recounted touches for a level to be kept",
    ),
    ParamMeta::percent(
        "consolidation_threshold",
        0.03,
        (0.01, 0.08, 0.005),
        "Maximum relative range of a valid consolidation zone",
    ),
];

/// Tunable knobs shared by the detectors.
///
/// Construct via [`Default`] and adjust fields, or via
/// [`with_params`](Self::with_params) from a name/value map.
/// [`validate`](Self::validate) checks every field against its metadata
/// range; [`crate::Analyzer::new`] calls it for you.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisParams {
    /// Bars in the analysis window (default 100)
    pub lookback_period: Period,
    /// Symmetric window for pivot extraction (default 5)
    pub pivot_window: Period,
    /// Merge gap for nearby levels (default 2%)
    pub merge_threshold: Percent,
    /// Minimum touches for a retained level (default 2)
    pub min_touches: u32,
    /// Maximum relative range of a consolidation zone (default 3%)
    pub consolidation_threshold: Percent,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            lookback_period: Period::new_const(100),
            pivot_window: Period::new_const(5),
            merge_threshold: Percent::new_const(0.02),
            min_touches: 2,
            consolidation_threshold: Percent::new_const(0.03),
        }
    }
}

impl AnalysisParams {
    /// Metadata for all configurable parameters
    pub fn param_meta() -> &'static [ParamMeta] {
        &PARAM_META
    }

    /// Build parameters from a name/value map; missing entries use defaults.
    pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let built = Self {
            lookback_period: get_period(params, "lookback_period", 100)?,
            pivot_window: get_period(params, "pivot_window", 5)?,
            merge_threshold: get_percent(params, "merge_threshold", 0.02)?,
            min_touches: params.get("min_touches").copied().unwrap_or(2.0) as u32,
            consolidation_threshold: get_percent(params, "consolidation_threshold", 0.03)?,
        };
        built.validate()?;
        Ok(built)
    }

    /// Check every field against its metadata range.
    pub fn validate(&self) -> Result<()> {
        for meta in Self::param_meta() {
            let value = match meta.name {
                "lookback_period" => self.lookback_period.get() as f64,
                "pivot_window" => self.pivot_window.get() as f64,
                "merge_threshold" => self.merge_threshold.get(),
                "min_touches" => f64::from(self.min_touches),
                "consolidation_threshold" => self.consolidation_threshold.get(),
                _ => continue,
            };
            meta.validate(value)?;
        }
        Ok(())
    }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Percent from params with default fallback
pub fn get_percent(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Percent> {
    let value = params.get(key).copied().unwrap_or(default);
    Percent::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
    let value = params.get(key).copied().unwrap_or(default as f64);
    Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================
