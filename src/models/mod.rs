//! Domain records and their create/patch payloads.
//!
//! Each entity module carries:
//! - a `FromRow` + `Serialize` record matching its table
//! - a `New*` payload for inserts
//! - a `*Patch` payload (all fields optional) merged onto the stored record
//!
//! Invariants live on the records themselves (`validate`) so the store can
//! check the merged result before anything is written.

pub mod activity;
pub mod catalog;
pub mod itinerary;
pub mod trip;
pub mod trip_block;
pub mod user;

use crate::error::AppError;

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}

pub(crate) fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Cascade summary returned by every delete: how many descendants went with
/// the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub itineraries: u64,
    pub trip_blocks: u64,
    pub activities: u64,
}
