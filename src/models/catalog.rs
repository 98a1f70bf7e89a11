use chrono::NaiveTime;
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, FromRow, Row};

/// Reference activity used for recommendations. Never owned by a trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogActivity {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub country: String,
    pub category: String,
    pub tags: Vec<String>,
    pub typical_duration_minutes: Option<i32>,
    pub average_cost: Option<f64>,
    pub recommended_time: NaiveTime,
    pub is_popular: bool,
}

impl CatalogActivity {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn tags_column(&self) -> String {
        self.tags.join(",")
    }
}

impl<'r> FromRow<'r, SqliteRow> for CatalogActivity {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let tags: String = row.try_get("tags")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            country: row.try_get("country")?,
            category: row.try_get("category")?,
            tags: split_tags(&tags),
            typical_duration_minutes: row.try_get("typical_duration_minutes")?,
            average_cost: row.try_get("average_cost")?,
            recommended_time: row.try_get("recommended_time")?,
            is_popular: row.try_get("is_popular")?,
        })
    }
}

/// Splits a comma-delimited tag field into trimmed, non-empty, de-duplicated
/// tags in first-seen order.
pub fn split_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tags_trims_and_drops_empties() {
        assert_eq!(
            split_tags(" food, outdoor ,,food,"),
            vec!["food".to_string(), "outdoor".to_string()]
        );
        assert!(split_tags("").is_empty());
    }
}
