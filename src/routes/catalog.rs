use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    extract::ApiQuery,
    models::{catalog::split_tags, catalog::CatalogActivity, normalize_optional},
    services::recommend::{CatalogRanges, Facets, FilterSpec},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(recommendations))
        .route("/filters", get(filters))
        .route("/ranges", get(ranges))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogQuery {
    country: Option<String>,
    location: Option<String>,
    category: Option<String>,
    /// Comma-separated.
    tags: Option<String>,
    min_cost: Option<f64>,
    max_cost: Option<f64>,
    min_duration: Option<i32>,
    max_duration: Option<i32>,
    popular: Option<bool>,
    limit: Option<usize>,
}

impl From<CatalogQuery> for FilterSpec {
    fn from(query: CatalogQuery) -> Self {
        let tags = normalize_optional(query.tags)
            .map(|raw| split_tags(&raw).into_iter().collect());
        FilterSpec {
            country: normalize_optional(query.country),
            location: normalize_optional(query.location),
            category: normalize_optional(query.category),
            tags,
            min_cost: query.min_cost,
            max_cost: query.max_cost,
            min_duration: query.min_duration,
            max_duration: query.max_duration,
            popular: query.popular,
            limit: query.limit,
        }
    }
}

async fn recommendations(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Json<Vec<CatalogActivity>>, AppError> {
    current.require_user()?;
    let spec = FilterSpec::from(query);
    Ok(Json(state.catalog.recommend(&spec).await?))
}

async fn filters(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Facets>, AppError> {
    current.require_user()?;
    Ok(Json(state.catalog.facets().await?))
}

async fn ranges(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<CatalogRanges>, AppError> {
    current.require_user()?;
    Ok(Json(state.catalog.ranges().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_values_mean_no_filter() {
        let spec = FilterSpec::from(CatalogQuery {
            country: Some("  ".into()),
            tags: Some(" food , outdoor".into()),
            ..CatalogQuery::default()
        });
        assert_eq!(spec.country, None);
        let tags: Vec<String> = spec.tags.unwrap().into_iter().collect();
        assert_eq!(tags, vec!["food".to_string(), "outdoor".to_string()]);
    }
}
