use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{normalize_optional, require_text, trip_block::TripBlock};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: i64,
    pub trip_block_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub category: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl Activity {
    /// Checks the activity on its own and against the block it belongs to.
    pub fn validate_within(&self, block: &TripBlock) -> Result<(), AppError> {
        require_text("title", &self.title)?;
        require_text("location", &self.location)?;
        if self.end_time <= self.start_time {
            return Err(AppError::validation("activity must end after it starts"));
        }
        if !block.contains(self.start_time, self.end_time) {
            return Err(AppError::validation(format!(
                "activity must fall within its trip block ({} to {})",
                block.start_time, block.end_time
            )));
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: ActivityPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = normalize_optional(patch.description);
        }
        if let Some(location) = patch.location {
            self.location = location.trim().to_string();
        }
        if patch.category.is_some() {
            self.category = normalize_optional(patch.category);
        }
        if let Some(start) = patch.start_time {
            self.start_time = start;
        }
        if let Some(end) = patch.end_time {
            self.end_time = end;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub category: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl NewActivity {
    pub fn into_activity(self, trip_block_id: i64) -> Activity {
        Activity {
            id: 0,
            trip_block_id,
            title: self.title.trim().to_string(),
            description: normalize_optional(self.description),
            location: self.location.trim().to_string(),
            category: normalize_optional(self.category),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}
