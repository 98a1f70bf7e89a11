use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

use super::{itinerary::ItineraryDetail, normalize_optional, require_text};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: i64,
    pub owner_user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub destinations: Json<Vec<String>>,
}

impl Trip {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)?;
        if self.end_date < self.start_date {
            return Err(AppError::validation(
                "trip end date must not be before its start date",
            ));
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: TripPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = normalize_optional(patch.description);
        }
        if let Some(start) = patch.start_date {
            self.start_date = start;
        }
        if let Some(end) = patch.end_date {
            self.end_date = end;
        }
        if let Some(destinations) = patch.destinations {
            self.destinations = Json(clean_destinations(destinations));
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrip {
    pub title: String,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub destinations: Vec<String>,
}

impl NewTrip {
    /// Builds the unsaved record for `owner_user_id`; id is assigned on insert.
    pub fn into_trip(self, owner_user_id: i64) -> Trip {
        Trip {
            id: 0,
            owner_user_id,
            title: self.title.trim().to_string(),
            description: normalize_optional(self.description),
            start_date: self.start_date,
            end_date: self.end_date,
            destinations: Json(clean_destinations(self.destinations)),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub destinations: Option<Vec<String>>,
}

/// A trip with its whole subtree loaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetail {
    #[serde(flatten)]
    pub trip: Trip,
    pub has_itinerary: bool,
    pub itinerary: Option<ItineraryDetail>,
}

fn clean_destinations(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .filter_map(|d| normalize_optional(Some(d)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_trip(start: &str, end: &str) -> NewTrip {
        NewTrip {
            title: " Japan ".into(),
            description: Some("   ".into()),
            start_date: start.parse().unwrap(),
            end_date: end.parse().unwrap(),
            destinations: vec!["Tokyo".into(), " ".into()],
        }
    }

    #[test]
    fn same_day_trip_is_valid() {
        let trip = new_trip("2024-06-01", "2024-06-01").into_trip(1);
        assert!(trip.validate().is_ok());
        assert_eq!(trip.title, "Japan");
        assert_eq!(trip.description, None);
        assert_eq!(trip.destinations.0, vec!["Tokyo".to_string()]);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let trip = new_trip("2024-06-10", "2024-06-01").into_trip(1);
        assert!(matches!(trip.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn patch_is_validated_after_merge() {
        let mut trip = new_trip("2024-06-01", "2024-06-10").into_trip(1);
        trip.apply(TripPatch {
            end_date: Some("2024-05-01".parse().unwrap()),
            ..TripPatch::default()
        });
        assert!(trip.validate().is_err());
    }
}
