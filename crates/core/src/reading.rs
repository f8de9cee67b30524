//! Sensor readings and the typed ingestion payload.
//!
//! A device sends an [`IngestPayload`] with a free-form `readings` map. The
//! payload is converted into a [`Reading`] keyed by [`Parameter`]; unknown
//! parameter names and physically impossible values are dropped per
//! parameter and never fail the whole reading.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::{SensorId, Timestamp};

/// A tracked water-quality parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Ph,
    Turbidity,
    Conductivity,
    Temperature,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Ph,
        Parameter::Turbidity,
        Parameter::Conductivity,
        Parameter::Temperature,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Parameter::Ph => "ph",
            Parameter::Turbidity => "turbidity",
            Parameter::Conductivity => "conductivity",
            Parameter::Temperature => "temperature",
        }
    }

    /// Display label used in operator-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Parameter::Ph => "pH",
            Parameter::Turbidity => "Turbidity",
            Parameter::Conductivity => "Conductivity",
            Parameter::Temperature => "Temperature",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Parameter::Ph => "",
            Parameter::Turbidity => " NTU",
            Parameter::Conductivity => " µS/cm",
            Parameter::Temperature => "°C",
        }
    }

    /// Range of values a working sensor can physically report.
    fn plausible_range(self) -> (f64, f64) {
        match self {
            Parameter::Ph => (0.0, 14.0),
            Parameter::Turbidity => (0.0, f64::MAX),
            Parameter::Conductivity => (0.0, f64::MAX),
            Parameter::Temperature => (-50.0, 100.0),
        }
    }

    /// Check that `value` is finite and physically plausible.
    pub fn validate_value(self, value: f64) -> Result<(), CoreError> {
        let (min, max) = self.plausible_range();
        if !value.is_finite() || value < min || value > max {
            return Err(CoreError::Validation(format!(
                "{} value {value} is out of range",
                self.as_str()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ph" => Ok(Parameter::Ph),
            "turbidity" => Ok(Parameter::Turbidity),
            "conductivity" => Ok(Parameter::Conductivity),
            "temperature" => Ok(Parameter::Temperature),
            other => Err(CoreError::Validation(format!("unknown parameter '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One validated sensor reading. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub timestamp: Timestamp,
    /// Present parameter values. Absent parameters are simply missing.
    pub values: BTreeMap<Parameter, f64>,
    pub battery_voltage: Option<f64>,
    pub signal_strength: Option<i32>,
}

impl Reading {
    pub fn new(sensor_id: impl Into<SensorId>, timestamp: Timestamp) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            timestamp,
            values: BTreeMap::new(),
            battery_voltage: None,
            signal_strength: None,
        }
    }

    /// Builder helper, mostly for tests and simulators.
    pub fn with_value(mut self, parameter: Parameter, value: f64) -> Self {
        self.values.insert(parameter, value);
        self
    }

    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        self.values.get(&parameter).copied()
    }
}

// ---------------------------------------------------------------------------
// Ingestion payload
// ---------------------------------------------------------------------------

/// Optional device location.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

/// Optional device health metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DeviceMetadata {
    #[validate(range(min = 0.0, max = 5.0))]
    pub battery_voltage: Option<f64>,
    #[validate(range(min = -120, max = 0))]
    pub signal_strength: Option<i32>,
}

/// Wire shape of a reading pushed by a device or gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestPayload {
    #[validate(length(min = 1, max = 50))]
    pub sensor_id: String,
    pub timestamp: Timestamp,
    #[validate(nested)]
    pub location: Option<Location>,
    pub readings: HashMap<String, f64>,
    #[validate(nested)]
    pub metadata: Option<DeviceMetadata>,
}

/// A parameter entry that was dropped while converting a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedValue {
    pub name: String,
    pub reason: String,
}

impl IngestPayload {
    /// Validate the envelope and convert it into a [`Reading`].
    ///
    /// Envelope problems (empty sensor id, bad location) fail the whole
    /// payload. Individual parameter problems are reported in the returned
    /// skip list instead.
    pub fn into_reading(self) -> Result<(Reading, Vec<SkippedValue>), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;

        let mut reading = Reading::new(self.sensor_id, self.timestamp);
        let mut skipped = Vec::new();

        for (name, value) in self.readings {
            let parameter = match name.parse::<Parameter>() {
                Ok(p) => p,
                Err(e) => {
                    skipped.push(SkippedValue { name, reason: e.to_string() });
                    continue;
                }
            };
            if let Err(e) = parameter.validate_value(value) {
                skipped.push(SkippedValue { name, reason: e.to_string() });
                continue;
            }
            reading.values.insert(parameter, value);
        }

        if let Some(meta) = self.metadata {
            reading.battery_voltage = meta.battery_voltage;
            reading.signal_strength = meta.signal_strength;
        }

        skipped.sort_by(|a, b| a.name.cmp(&b.name));
        Ok((reading, skipped))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
