//! Row structs.
//!
//! Severity columns are stored as lowercase `TEXT`; rows holding them keep
//! the raw string and convert into the domain type with `TryFrom`, surfacing
//! unexpected values as [`StoreError::Corrupt`](aquamine_core::store::StoreError).

pub mod alert;
pub mod alert_state;
pub mod reading;
pub mod recipient;
pub mod sensor;

use aquamine_core::severity::Severity;
use aquamine_core::store::StoreError;

pub(crate) fn parse_severity(column: &str, raw: &str) -> Result<Severity, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Corrupt(format!("{column} has unexpected value '{raw}'")))
}
