use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{activity::Activity, normalize_optional, require_text};
use crate::error::AppError;

/// One located, time-boxed leg of an itinerary.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripBlock {
    pub id: i64,
    pub itinerary_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl TripBlock {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)?;
        if self.end_time <= self.start_time {
            return Err(AppError::validation(
                "trip block must end after it starts",
            ));
        }
        Ok(())
    }

    pub fn contains(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_time <= start && end <= self.end_time
    }

    pub fn apply(&mut self, patch: TripBlockPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = normalize_optional(patch.description);
        }
        if patch.location.is_some() {
            self.location = normalize_optional(patch.location);
        }
        if patch.country.is_some() {
            self.country = normalize_optional(patch.country);
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
pub struct NewTripBlock {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl NewTripBlock {
    pub fn into_trip_block(self, itinerary_id: i64) -> TripBlock {
        TripBlock {
            id: 0,
            itinerary_id,
            title: self.title.trim().to_string(),
            description: normalize_optional(self.description),
            location: normalize_optional(self.location),
            country: normalize_optional(self.country),
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripBlockPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripBlockDetail {
    #[serde(flatten)]
    pub block: TripBlock,
    pub activities: Vec<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start: &str, end: &str) -> TripBlock {
        NewTripBlock {
            title: "Kyoto".into(),
            description: None,
            location: Some("Kyoto".into()),
            country: Some("Japan".into()),
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
        }
        .into_trip_block(1)
    }

    #[test]
    fn zero_length_block_is_rejected() {
        let b = block("2024-06-02T09:00:00", "2024-06-02T09:00:00");
        assert!(matches!(b.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn containment_is_inclusive_on_both_ends() {
        let b = block("2024-06-02T09:00:00", "2024-06-02T18:00:00");
        assert!(b.contains(b.start_time, b.end_time));
        assert!(!b.contains(
            "2024-06-02T08:59:00".parse().unwrap(),
            "2024-06-02T10:00:00".parse().unwrap()
        ));
    }
}
