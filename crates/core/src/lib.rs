//! AquaMine domain logic.
//!
//! Everything in this crate is pure decision logic or in-memory state: no
//! database or network access. The persistence and delivery crates plug in
//! through the traits in [`store`].
//!
//! - [`scoring`] -- Threshold Scorer (per parameter severity and score).
//! - [`aggregation`] -- Anomaly Aggregator (one severity per sensor).
//! - [`state_machine`] -- per-sensor alert lifecycle decisions.
//! - [`message`] -- shared alert / recovery message builder.

pub mod aggregation;
pub mod alert;
pub mod channels;
pub mod error;
pub mod message;
pub mod reading;
pub mod scoring;
pub mod severity;
pub mod state_machine;
pub mod store;
pub mod types;
