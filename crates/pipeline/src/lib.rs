//! Reading evaluation pipeline.
//!
//! [`Evaluator::evaluate`] is the single entry point used by ingestion: it
//! scores a reading, aggregates the per-parameter results, runs the sensor's
//! alert state machine inside one store transaction, and after a successful
//! commit publishes live events and queues notifications.

pub mod error;
pub mod evaluator;

pub use error::EvaluateError;
pub use evaluator::{EvaluationOutcome, Evaluator};
