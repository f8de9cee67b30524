//! Stored reading model and history filter.

use aquamine_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default page size for reading history.
pub const DEFAULT_READING_LIMIT: i64 = 100;

/// Largest page size accepted for reading history.
pub const MAX_READING_LIMIT: i64 = 1000;

/// A row from the `sensor_readings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReadingRow {
    pub id: DbId,
    pub sensor_id: String,
    pub recorded_at: Timestamp,
    pub ph: Option<f64>,
    pub turbidity: Option<f64>,
    pub conductivity: Option<f64>,
    pub temperature: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub signal_strength: Option<i32>,
}

/// `?start=&end=&limit=` for a sensor's reading history.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingFilter {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub limit: Option<i64>,
}

impl ReadingFilter {
    /// Page size clamped to `1..=MAX_READING_LIMIT`.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_READING_LIMIT)
            .clamp(1, MAX_READING_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(ReadingFilter::default().effective_limit(), 100);
        let huge = ReadingFilter {
            limit: Some(50_000),
            ..Default::default()
        };
        assert_eq!(huge.effective_limit(), MAX_READING_LIMIT);
        let zero = ReadingFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.effective_limit(), 1);
    }
}
