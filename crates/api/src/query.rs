//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// `?include_inactive=` for listings of soft-deactivated entities.
#[derive(Debug, Deserialize)]
pub struct IncludeInactiveParams {
    #[serde(default)]
    pub include_inactive: bool,
}
