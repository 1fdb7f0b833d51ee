//! Records served by the StaffDesk backend and their request payloads
//!
//! Field names follow the backend's camelCase JSON. Optional payload fields
//! are skipped when unset so that `PATCH` bodies only carry what changed.

#[macro_use]
pub mod macros;

pub mod user;
pub mod vacation_request;
pub mod work_entry;

pub use user::*;
pub use vacation_request::*;
pub use work_entry::*;

use serde::Serialize;
use validator::ValidationError;

/// Export formats accepted by the admin vacation export endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Pdf,
    /// Vacation requests only
    Ical,
}

wire_enum!(ExportFormat {
    Xlsx => "xlsx",
    Csv => "csv",
    Pdf => "pdf",
    Ical => "ical",
});

/// Listing sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validator for `HH:MM` clock times
pub fn clock_time(value: &str) -> Result<(), ValidationError> {
    crate::core::calendar::minutes_since_midnight(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("clock_time"))
}
