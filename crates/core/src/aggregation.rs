//! Anomaly Aggregator.
//!
//! Reduces the per-parameter anomalies of one evaluation window to a single
//! severity per sensor, using the maximum score so one critical parameter is
//! never diluted by milder ones.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::scoring::AnomalyResult;
use crate::severity::Severity;
use crate::types::SensorId;

/// Sensor-level severity for one evaluation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeverity {
    pub sensor_id: SensorId,
    pub max_score: f64,
    pub severity: Severity,
    /// Contributing anomalies, used to build operator messages.
    pub anomalies: Vec<AnomalyResult>,
}

/// Group anomalies by sensor and map each sensor's maximum score to a tier.
///
/// Results with a normal severity are not anomalies and are ignored, so a
/// sensor with nothing abnormal is absent from the output. Absence means
/// "nothing to report", not "recovered"; recovery is detected by the caller.
pub fn aggregate<I>(anomalies: I) -> BTreeMap<SensorId, AggregatedSeverity>
where
    I: IntoIterator<Item = AnomalyResult>,
{
    let mut by_sensor: BTreeMap<SensorId, Vec<AnomalyResult>> = BTreeMap::new();
    for a in anomalies.into_iter().filter(AnomalyResult::is_anomaly) {
        by_sensor.entry(a.sensor_id.clone()).or_default().push(a);
    }

    by_sensor
        .into_iter()
        .map(|(sensor_id, anomalies)| {
            let max_score = anomalies
                .iter()
                .map(|a| a.score)
                .fold(f64::MIN, f64::max);
            let aggregated = AggregatedSeverity {
                sensor_id: sensor_id.clone(),
                max_score,
                severity: Severity::from_score(max_score),
                anomalies,
            };
            (sensor_id, aggregated)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
