//! Threshold Scorer.
//!
//! Pure logic: maps a `(parameter, value)` pair to a severity tier and a
//! numeric score on the `0..=10` scale, using an independently configured
//! [`ThresholdBounds`] per parameter. Any bound may be absent, in which case
//! that side of the parameter is unconstrained.
//!
//! Score policy (see [`crate::severity`] for the band constants):
//!
//! - past a critical bound: `7.0 + 3.0 * distance / band`, capped at `10.0`
//! - past a warning bound only: `3.0 + 3.9 * distance / band`, capped at `6.9`
//! - otherwise: `0.0..=1.0`, rising as the value approaches the nearest bound
//!
//! `band` is the width between the warning and critical bound on the same
//! side, or the magnitude of the single configured bound when only one exists.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::reading::{Parameter, Reading};
use crate::severity::{
    Severity, CRITICAL_SCORE_FLOOR, MAX_SCORE, NORMAL_SCORE_CEILING, WARNING_SCORE_CEILING,
    WARNING_SCORE_FLOOR,
};
use crate::types::{SensorId, Timestamp};

/// Detection method tag recorded on every threshold-derived anomaly.
pub const DETECTION_METHOD_THRESHOLD: &str = "threshold";

/// Smallest warning score handed out, so a warning never rounds into the
/// normal band.
const MIN_WARNING_SCORE: f64 = WARNING_SCORE_FLOOR + 0.01;

/// Band width used when neither bound on a side has a usable magnitude.
const FALLBACK_BAND: f64 = 1.0;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Warning / critical bounds for a single parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdBounds {
    pub warning_low: Option<f64>,
    pub critical_low: Option<f64>,
    pub warning_high: Option<f64>,
    pub critical_high: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Low,
    High,
}

impl ThresholdBounds {
    pub fn is_unconstrained(&self) -> bool {
        self.warning_low.is_none()
            && self.critical_low.is_none()
            && self.warning_high.is_none()
            && self.critical_high.is_none()
    }

    /// Reject tables whose bounds are out of order (e.g. a critical low above
    /// the warning low).
    pub fn validate(&self, parameter: Parameter) -> Result<(), CoreError> {
        let ordered = [
            self.critical_low,
            self.warning_low,
            self.warning_high,
            self.critical_high,
        ];
        let present: Vec<f64> = ordered.iter().flatten().copied().collect();
        if present.iter().any(|b| !b.is_finite()) {
            return Err(CoreError::thresholds(parameter, "bounds must be finite"));
        }
        if present.windows(2).any(|w| w[0] > w[1]) {
            return Err(CoreError::thresholds(
                parameter,
                "bounds must satisfy critical_low <= warning_low <= warning_high <= critical_high",
            ));
        }
        Ok(())
    }

    fn side(&self, side: Side) -> (Option<f64>, Option<f64>) {
        match side {
            Side::Low => (self.warning_low, self.critical_low),
            Side::High => (self.warning_high, self.critical_high),
        }
    }

    fn band(&self, side: Side) -> f64 {
        match self.side(side) {
            (Some(w), Some(c)) if (c - w).abs() > f64::EPSILON => (c - w).abs(),
            (Some(b), _) | (None, Some(b)) if b.abs() > f64::EPSILON => b.abs(),
            _ => FALLBACK_BAND,
        }
    }

    /// Score a value against these bounds.
    pub fn score(&self, value: f64) -> ParameterScore {
        if self.is_unconstrained() {
            return ParameterScore::normal(0.0);
        }

        let sides = [Side::Low, Side::High];

        let critical = sides
            .iter()
            .filter_map(|&side| {
                let d = excess(self.side(side).1, value, side)?;
                Some((CRITICAL_SCORE_FLOOR + 3.0 * d / self.band(side)).min(MAX_SCORE))
            })
            .fold(None, max_opt);
        if let Some(score) = critical {
            return ParameterScore { severity: Severity::Critical, score };
        }

        let warning = sides
            .iter()
            .filter_map(|&side| {
                let d = excess(self.side(side).0, value, side)?;
                let span = WARNING_SCORE_CEILING - WARNING_SCORE_FLOOR;
                Some((WARNING_SCORE_FLOOR + span * d / self.band(side))
                    .clamp(MIN_WARNING_SCORE, WARNING_SCORE_CEILING))
            })
            .fold(None, max_opt);
        if let Some(score) = warning {
            return ParameterScore { severity: Severity::Warning, score };
        }

        // Inside all bounds: proximity to the nearest edge.
        let nearness = sides
            .iter()
            .filter_map(|&side| {
                let (w, c) = self.side(side);
                let edge = w.or(c)?;
                let inside = match side {
                    Side::Low => value - edge,
                    Side::High => edge - value,
                };
                Some((NORMAL_SCORE_CEILING - inside / self.band(side)).clamp(0.0, NORMAL_SCORE_CEILING))
            })
            .fold(None, max_opt);
        ParameterScore::normal(nearness.unwrap_or(0.0))
    }
}

/// How far `value` lies past `bound` on the given side, if it does.
fn excess(bound: Option<f64>, value: f64, side: Side) -> Option<f64> {
    let bound = bound?;
    let d = match side {
        Side::Low => bound - value,
        Side::High => value - bound,
    };
    (d > 0.0).then_some(d)
}

fn max_opt(acc: Option<f64>, v: f64) -> Option<f64> {
    Some(acc.map_or(v, |a| a.max(v)))
}

/// Tier and score for a single parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterScore {
    pub severity: Severity,
    pub score: f64,
}

impl ParameterScore {
    fn normal(score: f64) -> Self {
        Self { severity: Severity::Normal, score }
    }
}

// ---------------------------------------------------------------------------
// Threshold table
// ---------------------------------------------------------------------------

/// Per-parameter threshold configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    bounds: HashMap<Parameter, ThresholdBounds>,
}

impl Default for ThresholdTable {
    /// Acid mine drainage defaults.
    ///
    /// Temperature is informational and carries no thresholds.
    fn default() -> Self {
        let mut bounds = HashMap::new();
        bounds.insert(
            Parameter::Ph,
            ThresholdBounds {
                warning_low: Some(6.5),
                critical_low: Some(4.5),
                ..Default::default()
            },
        );
        bounds.insert(
            Parameter::Turbidity,
            ThresholdBounds {
                warning_high: Some(25.0),
                ..Default::default()
            },
        );
        bounds.insert(
            Parameter::Conductivity,
            ThresholdBounds {
                warning_high: Some(500.0),
                critical_high: Some(1000.0),
                ..Default::default()
            },
        );
        Self { bounds }
    }
}

impl ThresholdTable {
    /// An empty table: every parameter is unconstrained.
    pub fn empty() -> Self {
        Self { bounds: HashMap::new() }
    }

    /// Build a table from explicit entries, validating each one.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Parameter, ThresholdBounds)>,
    ) -> Result<Self, CoreError> {
        let mut bounds = HashMap::new();
        for (parameter, b) in entries {
            b.validate(parameter)?;
            bounds.insert(parameter, b);
        }
        Ok(Self { bounds })
    }

    /// Parse a JSON object of the form `{"ph": {"warning_low": 6.5, ...}, ...}`.
    ///
    /// Parameters missing from the document keep no thresholds.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let raw: HashMap<Parameter, ThresholdBounds> = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("threshold table is not valid JSON: {e}")))?;
        Self::from_entries(raw)
    }

    pub fn bounds(&self, parameter: Parameter) -> Option<&ThresholdBounds> {
        self.bounds.get(&parameter)
    }

    /// Parameters with at least one bound, in [`Parameter::ALL`] order.
    pub fn monitored(&self) -> Vec<Parameter> {
        Parameter::ALL
            .into_iter()
            .filter(|p| self.bounds(*p).is_some_and(|b| !b.is_unconstrained()))
            .collect()
    }

    /// Score a single value. Parameters without bounds always score normal / 0.
    pub fn score(&self, parameter: Parameter, value: f64) -> ParameterScore {
        match self.bounds.get(&parameter) {
            Some(b) => b.score(value),
            None => ParameterScore::normal(0.0),
        }
    }

    /// Score every present value of a reading, in parameter order.
    ///
    /// Absent values are skipped, never scored.
    pub fn score_reading(&self, reading: &Reading) -> Vec<AnomalyResult> {
        reading
            .values
            .iter()
            .map(|(&parameter, &value)| {
                let ParameterScore { severity, score } = self.score(parameter, value);
                AnomalyResult {
                    sensor_id: reading.sensor_id.clone(),
                    timestamp: reading.timestamp,
                    parameter,
                    value,
                    severity,
                    score,
                    method: DETECTION_METHOD_THRESHOLD.to_string(),
                    reason: format!("{parameter} value {value} indicates {severity} condition"),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// AnomalyResult
// ---------------------------------------------------------------------------

/// Outcome of scoring one parameter of one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub sensor_id: SensorId,
    pub timestamp: Timestamp,
    pub parameter: Parameter,
    pub value: f64,
    pub severity: Severity,
    pub score: f64,
    /// Detection method tag, e.g. [`DETECTION_METHOD_THRESHOLD`].
    pub method: String,
    pub reason: String,
}

impl AnomalyResult {
    /// Only non-normal results count as anomalies.
    pub fn is_anomaly(&self) -> bool {
        self.severity.is_elevated()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
