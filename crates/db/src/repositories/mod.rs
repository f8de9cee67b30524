//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Read paths take `&PgPool`; write paths used inside an evaluation
//! transaction take `&mut PgConnection` so callers pass `&mut *tx`.

pub mod alert_repo;
pub mod alert_state_repo;
pub mod anomaly_repo;
pub mod reading_repo;
pub mod recipient_repo;
pub mod sensor_repo;

pub use alert_repo::AlertRepo;
pub use alert_state_repo::SensorAlertStateRepo;
pub use anomaly_repo::AnomalyRepo;
pub use reading_repo::ReadingRepo;
pub use recipient_repo::RecipientRepo;
pub use sensor_repo::SensorRepo;
