//! Keyed storage for the trip hierarchy.
//!
//! Every write validates the full record first, so a rejected payload never
//! touches the database. Deletes cascade child-before-parent inside a single
//! transaction; each step is a plain `DELETE ... WHERE`, which makes a child
//! that vanished in the meantime a no-op rather than an error.

use sqlx::{FromRow, Sqlite, Transaction};
use tracing::{debug, info};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        activity::{Activity, ActivityPatch},
        itinerary::{Itinerary, ItineraryDetail, ItineraryPatch},
        trip::{Trip, TripDetail, TripPatch},
        trip_block::{TripBlock, TripBlockDetail, TripBlockPatch},
        CascadeReport,
    },
};

const TRIP_COLUMNS: &str = "id, owner_user_id, title, description, start_date, end_date, destinations";
const ITINERARY_COLUMNS: &str = "id, trip_id, title, description";
const TRIP_BLOCK_COLUMNS: &str =
    "id, itinerary_id, title, description, location, country, start_time, end_time";
const ACTIVITY_COLUMNS: &str =
    "id, trip_block_id, title, description, location, category, start_time, end_time";

const PURGE_ACTIVITIES_OF_TRIP: &str = "DELETE FROM activities WHERE trip_block_id IN \
     (SELECT tb.id FROM trip_blocks tb JOIN itineraries i ON i.id = tb.itinerary_id WHERE i.trip_id = ?1)";
const PURGE_BLOCKS_OF_TRIP: &str =
    "DELETE FROM trip_blocks WHERE itinerary_id IN (SELECT id FROM itineraries WHERE trip_id = ?1)";
const PURGE_ITINERARIES_OF_TRIP: &str = "DELETE FROM itineraries WHERE trip_id = ?1";

const PURGE_ACTIVITIES_OF_ITINERARY: &str = "DELETE FROM activities WHERE trip_block_id IN \
     (SELECT id FROM trip_blocks WHERE itinerary_id = ?1)";
const PURGE_BLOCKS_OF_ITINERARY: &str = "DELETE FROM trip_blocks WHERE itinerary_id = ?1";

const PURGE_ACTIVITIES_OF_BLOCK: &str = "DELETE FROM activities WHERE trip_block_id = ?1";

/// The trip an entity ultimately hangs off, and who owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct TripScope {
    pub trip_id: i64,
    pub owner_user_id: i64,
}

#[derive(Clone)]
pub struct EntityStore {
    db: DbPool,
}

impl EntityStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    // --- trips ---------------------------------------------------------

    pub async fn create_trip(&self, trip: Trip) -> Result<Trip, AppError> {
        trip.validate()?;
        let saved = sqlx::query_as::<_, Trip>(&format!(
            "INSERT INTO trips (owner_user_id, title, description, start_date, end_date, destinations) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {TRIP_COLUMNS}"
        ))
        .bind(trip.owner_user_id)
        .bind(&trip.title)
        .bind(&trip.description)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(&trip.destinations)
        .fetch_one(&self.db)
        .await?;
        info!(trip_id = saved.id, owner = saved.owner_user_id, "trip created");
        Ok(saved)
    }

    pub async fn get_trip(&self, id: i64) -> Result<Trip, AppError> {
        sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update_trip(&self, id: i64, patch: TripPatch) -> Result<Trip, AppError> {
        let mut trip = self.get_trip(id).await?;
        trip.apply(patch);
        trip.validate()?;
        let saved = sqlx::query_as::<_, Trip>(&format!(
            "UPDATE trips SET title = ?1, description = ?2, start_date = ?3, end_date = ?4, \
             destinations = ?5 WHERE id = ?6 RETURNING {TRIP_COLUMNS}"
        ))
        .bind(&trip.title)
        .bind(&trip.description)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(&trip.destinations)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)?;
        info!(trip_id = id, "trip updated");
        Ok(saved)
    }

    pub async fn delete_trip(&self, id: i64) -> Result<CascadeReport, AppError> {
        let mut tx = self.db.begin().await?;
        let report = CascadeReport {
            activities: purge(&mut tx, PURGE_ACTIVITIES_OF_TRIP, id).await?,
            trip_blocks: purge(&mut tx, PURGE_BLOCKS_OF_TRIP, id).await?,
            itineraries: purge(&mut tx, PURGE_ITINERARIES_OF_TRIP, id).await?,
        };
        if purge(&mut tx, "DELETE FROM trips WHERE id = ?1", id).await? == 0 {
            return Err(AppError::NotFound);
        }
        tx.commit().await?;
        info!(trip_id = id, ?report, "trip deleted");
        Ok(report)
    }

    pub async fn list_trips_by_owner(&self, owner_user_id: i64) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE owner_user_id = ?1 ORDER BY start_date, id"
        ))
        .bind(owner_user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(trips)
    }

    pub async fn list_all_trips(&self) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips ORDER BY start_date, id"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(trips)
    }

    /// Loads a trip with its whole subtree from one read snapshot.
    pub async fn trip_tree(&self, id: i64) -> Result<TripDetail, AppError> {
        let mut tx = self.db.begin().await?;
        let trip = sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound)?;
        let itinerary = sqlx::query_as::<_, Itinerary>(&format!(
            "SELECT {ITINERARY_COLUMNS} FROM itineraries WHERE trip_id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let itinerary = match itinerary {
            None => None,
            Some(itinerary) => {
                let blocks = sqlx::query_as::<_, TripBlock>(&format!(
                    "SELECT {TRIP_BLOCK_COLUMNS} FROM trip_blocks WHERE itinerary_id = ?1 \
                     ORDER BY start_time, id"
                ))
                .bind(itinerary.id)
                .fetch_all(&mut *tx)
                .await?;
                let mut trip_blocks = Vec::with_capacity(blocks.len());
                for block in blocks {
                    let activities = sqlx::query_as::<_, Activity>(&format!(
                        "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE trip_block_id = ?1 \
                         ORDER BY start_time, id"
                    ))
                    .bind(block.id)
                    .fetch_all(&mut *tx)
                    .await?;
                    trip_blocks.push(TripBlockDetail { block, activities });
                }
                Some(ItineraryDetail {
                    itinerary,
                    trip_blocks,
                })
            }
        };
        tx.commit().await?;

        Ok(TripDetail {
            trip,
            has_itinerary: itinerary.is_some(),
            itinerary,
        })
    }

    // --- itineraries ---------------------------------------------------

    pub async fn create_itinerary(&self, itinerary: Itinerary) -> Result<Itinerary, AppError> {
        itinerary.validate()?;
        let saved = sqlx::query_as::<_, Itinerary>(&format!(
            "INSERT INTO itineraries (trip_id, title, description) VALUES (?1, ?2, ?3) \
             RETURNING {ITINERARY_COLUMNS}"
        ))
        .bind(itinerary.trip_id)
        .bind(&itinerary.title)
        .bind(&itinerary.description)
        .fetch_one(&self.db)
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => {
                AppError::Conflict("trip already has an itinerary".into())
            }
            other => other,
        })?;
        info!(itinerary_id = saved.id, trip_id = saved.trip_id, "itinerary created");
        Ok(saved)
    }

    pub async fn get_itinerary(&self, id: i64) -> Result<Itinerary, AppError> {
        sqlx::query_as::<_, Itinerary>(&format!(
            "SELECT {ITINERARY_COLUMNS} FROM itineraries WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn itinerary_for_trip(&self, trip_id: i64) -> Result<Option<Itinerary>, AppError> {
        let itinerary = sqlx::query_as::<_, Itinerary>(&format!(
            "SELECT {ITINERARY_COLUMNS} FROM itineraries WHERE trip_id = ?1"
        ))
        .bind(trip_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(itinerary)
    }

    pub async fn update_itinerary(
        &self,
        id: i64,
        patch: ItineraryPatch,
    ) -> Result<Itinerary, AppError> {
        let mut itinerary = self.get_itinerary(id).await?;
        itinerary.apply(patch);
        itinerary.validate()?;
        let saved = sqlx::query_as::<_, Itinerary>(&format!(
            "UPDATE itineraries SET title = ?1, description = ?2 WHERE id = ?3 \
             RETURNING {ITINERARY_COLUMNS}"
        ))
        .bind(&itinerary.title)
        .bind(&itinerary.description)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)?;
        info!(itinerary_id = id, "itinerary updated");
        Ok(saved)
    }

    pub async fn delete_itinerary(&self, id: i64) -> Result<CascadeReport, AppError> {
        let mut tx = self.db.begin().await?;
        let activities = purge(&mut tx, PURGE_ACTIVITIES_OF_ITINERARY, id).await?;
        let trip_blocks = purge(&mut tx, PURGE_BLOCKS_OF_ITINERARY, id).await?;
        if purge(&mut tx, "DELETE FROM itineraries WHERE id = ?1", id).await? == 0 {
            return Err(AppError::NotFound);
        }
        tx.commit().await?;
        let report = CascadeReport {
            itineraries: 0,
            trip_blocks,
            activities,
        };
        info!(itinerary_id = id, ?report, "itinerary deleted");
        Ok(report)
    }

    // --- trip blocks ---------------------------------------------------

    pub async fn create_trip_block(&self, block: TripBlock) -> Result<TripBlock, AppError> {
        block.validate()?;
        let saved = sqlx::query_as::<_, TripBlock>(&format!(
            "INSERT INTO trip_blocks (itinerary_id, title, description, location, country, start_time, end_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {TRIP_BLOCK_COLUMNS}"
        ))
        .bind(block.itinerary_id)
        .bind(&block.title)
        .bind(&block.description)
        .bind(&block.location)
        .bind(&block.country)
        .bind(block.start_time)
        .bind(block.end_time)
        .fetch_one(&self.db)
        .await?;
        info!(trip_block_id = saved.id, itinerary_id = saved.itinerary_id, "trip block created");
        Ok(saved)
    }

    pub async fn get_trip_block(&self, id: i64) -> Result<TripBlock, AppError> {
        sqlx::query_as::<_, TripBlock>(&format!(
            "SELECT {TRIP_BLOCK_COLUMNS} FROM trip_blocks WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn list_trip_blocks(&self, itinerary_id: i64) -> Result<Vec<TripBlock>, AppError> {
        let blocks = sqlx::query_as::<_, TripBlock>(&format!(
            "SELECT {TRIP_BLOCK_COLUMNS} FROM trip_blocks WHERE itinerary_id = ?1 ORDER BY start_time, id"
        ))
        .bind(itinerary_id)
        .fetch_all(&self.db)
        .await?;
        Ok(blocks)
    }

    /// Rejects a new time range that would strand any existing activity.
    pub async fn update_trip_block(
        &self,
        id: i64,
        patch: TripBlockPatch,
    ) -> Result<TripBlock, AppError> {
        let mut block = self.get_trip_block(id).await?;
        block.apply(patch);
        block.validate()?;
        for activity in self.list_activities(id).await? {
            activity.validate_within(&block)?;
        }
        let saved = sqlx::query_as::<_, TripBlock>(&format!(
            "UPDATE trip_blocks SET title = ?1, description = ?2, location = ?3, country = ?4, \
             start_time = ?5, end_time = ?6 WHERE id = ?7 RETURNING {TRIP_BLOCK_COLUMNS}"
        ))
        .bind(&block.title)
        .bind(&block.description)
        .bind(&block.location)
        .bind(&block.country)
        .bind(block.start_time)
        .bind(block.end_time)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)?;
        info!(trip_block_id = id, "trip block updated");
        Ok(saved)
    }

    pub async fn delete_trip_block(&self, id: i64) -> Result<CascadeReport, AppError> {
        let mut tx = self.db.begin().await?;
        let activities = purge(&mut tx, PURGE_ACTIVITIES_OF_BLOCK, id).await?;
        if purge(&mut tx, "DELETE FROM trip_blocks WHERE id = ?1", id).await? == 0 {
            return Err(AppError::NotFound);
        }
        tx.commit().await?;
        let report = CascadeReport {
            activities,
            ..CascadeReport::default()
        };
        info!(trip_block_id = id, ?report, "trip block deleted");
        Ok(report)
    }

    // --- activities ----------------------------------------------------

    pub async fn create_activity(&self, activity: Activity) -> Result<Activity, AppError> {
        let block = self.get_trip_block(activity.trip_block_id).await?;
        activity.validate_within(&block)?;
        let saved = sqlx::query_as::<_, Activity>(&format!(
            "INSERT INTO activities (trip_block_id, title, description, location, category, start_time, end_time) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(activity.trip_block_id)
        .bind(&activity.title)
        .bind(&activity.description)
        .bind(&activity.location)
        .bind(&activity.category)
        .bind(activity.start_time)
        .bind(activity.end_time)
        .fetch_one(&self.db)
        .await?;
        info!(activity_id = saved.id, trip_block_id = saved.trip_block_id, "activity created");
        Ok(saved)
    }

    pub async fn get_activity(&self, id: i64) -> Result<Activity, AppError> {
        sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn list_activities(&self, trip_block_id: i64) -> Result<Vec<Activity>, AppError> {
        let activities = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE trip_block_id = ?1 ORDER BY start_time, id"
        ))
        .bind(trip_block_id)
        .fetch_all(&self.db)
        .await?;
        Ok(activities)
    }

    pub async fn update_activity(
        &self,
        id: i64,
        patch: ActivityPatch,
    ) -> Result<Activity, AppError> {
        let mut activity = self.get_activity(id).await?;
        activity.apply(patch);
        let block = self.get_trip_block(activity.trip_block_id).await?;
        activity.validate_within(&block)?;
        let saved = sqlx::query_as::<_, Activity>(&format!(
            "UPDATE activities SET title = ?1, description = ?2, location = ?3, category = ?4, \
             start_time = ?5, end_time = ?6 WHERE id = ?7 RETURNING {ACTIVITY_COLUMNS}"
        ))
        .bind(&activity.title)
        .bind(&activity.description)
        .bind(&activity.location)
        .bind(&activity.category)
        .bind(activity.start_time)
        .bind(activity.end_time)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::NotFound)?;
        info!(activity_id = id, "activity updated");
        Ok(saved)
    }

    pub async fn delete_activity(&self, id: i64) -> Result<CascadeReport, AppError> {
        let removed = sqlx::query("DELETE FROM activities WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(AppError::NotFound);
        }
        info!(activity_id = id, "activity deleted");
        Ok(CascadeReport::default())
    }

    // --- ownership -----------------------------------------------------

    pub async fn trip_scope(&self, trip_id: i64) -> Result<TripScope, AppError> {
        self.scope(
            "SELECT id AS trip_id, owner_user_id FROM trips WHERE id = ?1",
            trip_id,
        )
        .await
    }

    pub async fn itinerary_scope(&self, itinerary_id: i64) -> Result<TripScope, AppError> {
        self.scope(
            "SELECT t.id AS trip_id, t.owner_user_id FROM itineraries i \
             JOIN trips t ON t.id = i.trip_id WHERE i.id = ?1",
            itinerary_id,
        )
        .await
    }

    pub async fn trip_block_scope(&self, trip_block_id: i64) -> Result<TripScope, AppError> {
        self.scope(
            "SELECT t.id AS trip_id, t.owner_user_id FROM trip_blocks tb \
             JOIN itineraries i ON i.id = tb.itinerary_id \
             JOIN trips t ON t.id = i.trip_id WHERE tb.id = ?1",
            trip_block_id,
        )
        .await
    }

    pub async fn activity_scope(&self, activity_id: i64) -> Result<TripScope, AppError> {
        self.scope(
            "SELECT t.id AS trip_id, t.owner_user_id FROM activities a \
             JOIN trip_blocks tb ON tb.id = a.trip_block_id \
             JOIN itineraries i ON i.id = tb.itinerary_id \
             JOIN trips t ON t.id = i.trip_id WHERE a.id = ?1",
            activity_id,
        )
        .await
    }

    async fn scope(&self, sql: &str, id: i64) -> Result<TripScope, AppError> {
        let scope = sqlx::query_as::<_, TripScope>(sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        debug!(id, trip_id = scope.trip_id, "resolved trip scope");
        Ok(scope)
    }
}

async fn purge(tx: &mut Transaction<'_, Sqlite>, sql: &str, id: i64) -> Result<u64, AppError> {
    let result = sqlx::query(sql).bind(id).execute(&mut **tx).await?;
    Ok(result.rows_affected())
}
