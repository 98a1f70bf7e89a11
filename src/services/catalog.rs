use chrono::NaiveTime;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        catalog::{split_tags, CatalogActivity},
        normalize_optional, require_text,
    },
    services::recommend::{self, CatalogRanges, Facets, FilterSpec},
};

const CATALOG_COLUMNS: &str = "id, title, description, location, country, category, tags, \
     typical_duration_minutes, average_cost, recommended_time, is_popular";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    #[default]
    Append,
    Replace,
}

#[derive(Clone)]
pub struct CatalogService {
    db: DbPool,
}

impl CatalogService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// The whole catalog in insertion order.
    pub async fn all(&self) -> Result<Vec<CatalogActivity>, AppError> {
        let entries = sqlx::query_as::<_, CatalogActivity>(&format!(
            "SELECT {CATALOG_COLUMNS} FROM activity_catalog ORDER BY id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }

    pub async fn recommend(&self, spec: &FilterSpec) -> Result<Vec<CatalogActivity>, AppError> {
        let catalog = self.all().await?;
        let found: Vec<CatalogActivity> = recommend::filter(&catalog, spec)
            .into_iter()
            .cloned()
            .collect();
        debug!(matched = found.len(), total = catalog.len(), "catalog filtered");
        Ok(found)
    }

    pub async fn facets(&self) -> Result<Facets, AppError> {
        Ok(recommend::facets(&self.all().await?))
    }

    pub async fn ranges(&self) -> Result<CatalogRanges, AppError> {
        Ok(recommend::ranges(&self.all().await?))
    }

    /// Parses and stores a CSV upload. Nothing is written unless the upload
    /// has at least one row and every row parses; replace mode swaps the
    /// catalog in one transaction.
    pub async fn ingest_csv(
        &self,
        raw: &[u8],
        mode: IngestMode,
    ) -> Result<Vec<CatalogActivity>, AppError> {
        let rows = parse_csv(raw)?;
        let saved = self.store(rows, mode).await?;
        info!(count = saved.len(), ?mode, "catalog ingested");
        Ok(saved)
    }

    pub async fn store(
        &self,
        rows: Vec<CatalogActivity>,
        mode: IngestMode,
    ) -> Result<Vec<CatalogActivity>, AppError> {
        let mut tx = self.db.begin().await?;
        if mode == IngestMode::Replace {
            let removed = sqlx::query("DELETE FROM activity_catalog")
                .execute(&mut *tx)
                .await?
                .rows_affected();
            debug!(removed, "catalog cleared for replace");
        }

        let mut saved = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = sqlx::query_as::<_, CatalogActivity>(&format!(
                "INSERT INTO activity_catalog (title, description, location, country, category, tags, \
                 typical_duration_minutes, average_cost, recommended_time, is_popular) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {CATALOG_COLUMNS}"
            ))
            .bind(&row.title)
            .bind(&row.description)
            .bind(&row.location)
            .bind(&row.country)
            .bind(&row.category)
            .bind(row.tags_column())
            .bind(row.typical_duration_minutes)
            .bind(row.average_cost)
            .bind(row.recommended_time)
            .bind(row.is_popular)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(entry);
        }
        tx.commit().await?;
        Ok(saved)
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    title: String,
    #[serde(default)]
    description: Option<String>,
    location: String,
    country: String,
    category: String,
    #[serde(default)]
    typical_duration_minutes: Option<i32>,
    #[serde(default)]
    average_cost: Option<f64>,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    is_popular: String,
    recommended_time: String,
}

impl CsvRow {
    fn into_entry(self) -> Result<CatalogActivity, AppError> {
        require_text("title", &self.title)?;
        require_text("location", &self.location)?;
        require_text("country", &self.country)?;
        require_text("category", &self.category)?;
        let recommended_time = parse_time(&self.recommended_time).ok_or_else(|| {
            AppError::validation(format!(
                "invalid recommended_time {:?}, expected HH:MM",
                self.recommended_time
            ))
        })?;

        Ok(CatalogActivity {
            id: 0,
            title: self.title,
            description: normalize_optional(self.description),
            location: self.location,
            country: self.country,
            category: self.category,
            tags: split_tags(&self.tags),
            typical_duration_minutes: self.typical_duration_minutes,
            average_cost: self.average_cost,
            recommended_time,
            is_popular: self.is_popular.eq_ignore_ascii_case("true"),
        })
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Header row required. The delimiter is `;` when the header contains one,
/// otherwise `,` (tags then need quoting).
pub fn parse_csv(raw: &[u8]) -> Result<Vec<CatalogActivity>, AppError> {
    let header = raw.split(|b| *b == b'\n').next().unwrap_or_default();
    if header.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("catalog upload is empty".into()));
    }
    let delimiter = if header.contains(&b';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(raw);

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row_no = idx + 1;
        let entry = record
            .map_err(|err| AppError::BadRequest(format!("row {row_no}: {err}")))
            .and_then(|row| {
                row.into_entry().map_err(|err| match err {
                    AppError::Validation(msg) => AppError::BadRequest(format!("row {row_no}: {msg}")),
                    other => other,
                })
            });
        match entry {
            Ok(entry) => rows.push(entry),
            Err(err) => {
                warn!("rejected catalog upload: {err}");
                return Err(err);
            }
        }
    }
    if rows.is_empty() {
        warn!("rejected catalog upload without rows");
        return Err(AppError::BadRequest("catalog upload has no rows".into()));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEMICOLON_CSV: &str = "\
title;description;location;country;category;typical_duration_minutes;average_cost;tags;is_popular;recommended_time
Nishiki Market; Food stalls ;Kyoto;Japan;Food;90;15.5;food, market;TRUE;11:00
Fushimi Inari;;Kyoto;Japan;Sightseeing;;;outdoor;false;07:30
";

    #[test]
    fn parses_semicolon_upload() {
        let rows = parse_csv(SEMICOLON_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        let market = &rows[0];
        assert_eq!(market.description.as_deref(), Some("Food stalls"));
        assert_eq!(market.tags, vec!["food".to_string(), "market".to_string()]);
        assert_eq!(market.typical_duration_minutes, Some(90));
        assert_eq!(market.average_cost, Some(15.5));
        assert!(market.is_popular);
        assert_eq!(market.recommended_time, NaiveTime::from_hms_opt(11, 0, 0).unwrap());

        let shrine = &rows[1];
        assert_eq!(shrine.description, None);
        assert_eq!(shrine.typical_duration_minutes, None);
        assert_eq!(shrine.average_cost, None);
        assert!(!shrine.is_popular);
    }

    #[test]
    fn parses_comma_upload_with_quoted_tags() {
        let csv = "title,location,country,category,tags,is_popular,recommended_time\n\
                   Louvre,Paris,France,Museum,\"museum,art\",true,09:00\n";
        let rows = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].tags, vec!["museum".to_string(), "art".to_string()]);
        assert_eq!(rows[0].description, None);
    }

    #[test]
    fn bad_row_rejects_whole_upload() {
        let csv = "title;location;country;category;tags;is_popular;recommended_time\n\
                   Ok;Kyoto;Japan;Food;food;true;10:00\n\
                   Bad;Kyoto;Japan;Food;food;true;noon\n";
        match parse_csv(csv.as_bytes()) {
            Err(AppError::BadRequest(msg)) => assert!(msg.starts_with("row 2")),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn empty_upload_is_rejected() {
        assert!(matches!(parse_csv(b""), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn header_without_rows_is_rejected() {
        let csv = "title;location;country;category;tags;is_popular;recommended_time\n";
        match parse_csv(csv.as_bytes()) {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "catalog upload has no rows"),
            other => panic!("expected bad request, got {other:?}"),
        }
    }
}
