use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{normalize_optional, require_text, trip_block::TripBlockDetail};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub id: i64,
    pub trip_id: i64,
    pub title: String,
    pub description: Option<String>,
}

impl Itinerary {
    pub fn validate(&self) -> Result<(), AppError> {
        require_text("title", &self.title)
    }

    pub fn apply(&mut self, patch: ItineraryPatch) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if patch.description.is_some() {
            self.description = normalize_optional(patch.description);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewItinerary {
    pub title: String,
    pub description: Option<String>,
}

impl NewItinerary {
    pub fn into_itinerary(self, trip_id: i64) -> Itinerary {
        Itinerary {
            id: 0,
            trip_id,
            title: self.title.trim().to_string(),
            description: normalize_optional(self.description),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItineraryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDetail {
    #[serde(flatten)]
    pub itinerary: Itinerary,
    pub trip_blocks: Vec<TripBlockDetail>,
}
