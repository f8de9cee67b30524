//! Severity tiers and the numeric score bands shared by the scorer and the
//! aggregator.
//!
//! Scores live on a `0.0..=10.0` scale:
//!
//! | Score          | Tier       |
//! |----------------|------------|
//! | `0.0..=3.0`    | `normal`   |
//! | `(3.0, 7.0)`   | `warning`  |
//! | `7.0..=10.0`   | `critical` |
//!
//! The scorer emits normal scores in `0.0..=1.0`, warning scores in
//! `(3.0, 6.9]` and critical scores in `[7.0, 10.0]`, so [`Severity::from_score`]
//! always maps a score back to the tier the scorer assigned it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lower bound (exclusive) of the warning band.
pub const WARNING_SCORE_FLOOR: f64 = 3.0;

/// Highest score the scorer will give a warning-tier value.
pub const WARNING_SCORE_CEILING: f64 = 6.9;

/// Lower bound (inclusive) of the critical band.
pub const CRITICAL_SCORE_FLOOR: f64 = 7.0;

/// Maximum score on the scale.
pub const MAX_SCORE: f64 = 10.0;

/// Highest score the scorer will give a normal-tier value.
pub const NORMAL_SCORE_CEILING: f64 = 1.0;

/// Risk tier of a parameter, a sensor, or a sensor's alert state.
///
/// Variant order is risk order, so `Ord` compares by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl Severity {
    /// Numeric rank: `normal = 0`, `warning = 1`, `critical = 2`.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Normal => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
        }
    }

    /// Map a score on the `0..=10` scale to its tier.
    pub fn from_score(score: f64) -> Self {
        if score >= CRITICAL_SCORE_FLOOR {
            Severity::Critical
        } else if score > WARNING_SCORE_FLOOR {
            Severity::Warning
        } else {
            Severity::Normal
        }
    }

    /// Lowercase name used in JSON and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn is_elevated(self) -> bool {
        self != Severity::Normal
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Severity::Normal),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(CoreError::Validation(format!(
                "unknown severity '{other}', expected normal, warning or critical"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
