/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Stable external sensor identifier (e.g. `"AMD-01"`), as sent by the device.
pub type SensorId = String;
