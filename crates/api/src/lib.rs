//! AquaMine API server library.
//!
//! Exposes config, state, error handling, routes and the live WebSocket
//! endpoint so the binary and integration tests build the same app.

pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
