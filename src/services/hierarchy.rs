//! Authorized operations over the trip hierarchy.
//!
//! Every call takes the acting [`Principal`] explicitly. Ownership is always
//! resolved through the entity's root trip: a non-admin may only touch a
//! subtree whose trip they own. Mutations additionally hold the root trip's
//! lock for their whole duration.

use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::{
    auth::Principal,
    db::DbPool,
    error::AppError,
    models::{
        activity::{Activity, ActivityPatch, NewActivity},
        itinerary::{Itinerary, ItineraryPatch, NewItinerary},
        trip::{NewTrip, Trip, TripDetail, TripPatch},
        trip_block::{NewTripBlock, TripBlock, TripBlockPatch},
        CascadeReport,
    },
    services::{
        locks::TripLocks,
        store::{EntityStore, TripScope},
    },
};

#[derive(Clone)]
pub struct HierarchyService {
    store: EntityStore,
    locks: TripLocks,
}

impl HierarchyService {
    pub fn new(db: DbPool) -> Self {
        Self {
            store: EntityStore::new(db),
            locks: TripLocks::new(),
        }
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    async fn lock_scope(
        &self,
        caller: &Principal,
        scope: TripScope,
    ) -> Result<OwnedMutexGuard<()>, AppError> {
        caller.authorize_owner(scope.owner_user_id)?;
        Ok(self.locks.acquire(scope.trip_id).await)
    }

    // --- trips ---------------------------------------------------------

    pub async fn create_trip(&self, caller: &Principal, new_trip: NewTrip) -> Result<Trip, AppError> {
        self.store
            .create_trip(new_trip.into_trip(caller.user_id))
            .await
    }

    pub async fn trip_detail(
        &self,
        caller: &Principal,
        trip_id: i64,
    ) -> Result<TripDetail, AppError> {
        let scope = self.store.trip_scope(trip_id).await?;
        caller.authorize_owner(scope.owner_user_id)?;
        self.store.trip_tree(trip_id).await
    }

    /// Own trips for users; every trip for admins.
    pub async fn list_trips_for_user(&self, caller: &Principal) -> Result<Vec<Trip>, AppError> {
        let trips = if caller.is_admin() {
            self.store.list_all_trips().await?
        } else {
            self.store.list_trips_by_owner(caller.user_id).await?
        };
        debug!(user_id = caller.user_id, count = trips.len(), "listed trips");
        Ok(trips)
    }

    pub async fn update_trip(
        &self,
        caller: &Principal,
        trip_id: i64,
        patch: TripPatch,
    ) -> Result<Trip, AppError> {
        let scope = self.store.trip_scope(trip_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store.update_trip(trip_id, patch).await
    }

    pub async fn delete_trip(
        &self,
        caller: &Principal,
        trip_id: i64,
    ) -> Result<CascadeReport, AppError> {
        let scope = self.store.trip_scope(trip_id).await?;
        let guard = self.lock_scope(caller, scope).await?;
        let report = self.store.delete_trip(trip_id).await?;
        drop(guard);
        self.locks.forget(trip_id);
        Ok(report)
    }

    // --- itineraries ---------------------------------------------------

    pub async fn create_itinerary(
        &self,
        caller: &Principal,
        trip_id: i64,
        new_itinerary: NewItinerary,
    ) -> Result<Itinerary, AppError> {
        let scope = self.store.trip_scope(trip_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        if self.store.itinerary_for_trip(trip_id).await?.is_some() {
            return Err(AppError::Conflict("trip already has an itinerary".into()));
        }
        self.store
            .create_itinerary(new_itinerary.into_itinerary(trip_id))
            .await
    }

    pub async fn get_itinerary(
        &self,
        caller: &Principal,
        itinerary_id: i64,
    ) -> Result<Itinerary, AppError> {
        let scope = self.store.itinerary_scope(itinerary_id).await?;
        caller.authorize_owner(scope.owner_user_id)?;
        self.store.get_itinerary(itinerary_id).await
    }

    pub async fn itinerary_for_trip(
        &self,
        caller: &Principal,
        trip_id: i64,
    ) -> Result<Itinerary, AppError> {
        let scope = self.store.trip_scope(trip_id).await?;
        caller.authorize_owner(scope.owner_user_id)?;
        self.store
            .itinerary_for_trip(trip_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update_itinerary(
        &self,
        caller: &Principal,
        itinerary_id: i64,
        patch: ItineraryPatch,
    ) -> Result<Itinerary, AppError> {
        let scope = self.store.itinerary_scope(itinerary_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store.update_itinerary(itinerary_id, patch).await
    }

    pub async fn delete_itinerary(
        &self,
        caller: &Principal,
        itinerary_id: i64,
    ) -> Result<CascadeReport, AppError> {
        let scope = self.store.itinerary_scope(itinerary_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store.delete_itinerary(itinerary_id).await
    }

    // --- trip blocks ---------------------------------------------------

    pub async fn create_trip_block(
        &self,
        caller: &Principal,
        itinerary_id: i64,
        new_block: NewTripBlock,
    ) -> Result<TripBlock, AppError> {
        let scope = self.store.itinerary_scope(itinerary_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store
            .create_trip_block(new_block.into_trip_block(itinerary_id))
            .await
    }

    pub async fn get_trip_block(
        &self,
        caller: &Principal,
        trip_block_id: i64,
    ) -> Result<TripBlock, AppError> {
        let scope = self.store.trip_block_scope(trip_block_id).await?;
        caller.authorize_owner(scope.owner_user_id)?;
        self.store.get_trip_block(trip_block_id).await
    }

    pub async fn list_trip_blocks(
        &self,
        caller: &Principal,
        itinerary_id: i64,
    ) -> Result<Vec<TripBlock>, AppError> {
        let scope = self.store.itinerary_scope(itinerary_id).await?;
        caller.authorize_owner(scope.owner_user_id)?;
        self.store.list_trip_blocks(itinerary_id).await
    }

    pub async fn update_trip_block(
        &self,
        caller: &Principal,
        trip_block_id: i64,
        patch: TripBlockPatch,
    ) -> Result<TripBlock, AppError> {
        let scope = self.store.trip_block_scope(trip_block_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store.update_trip_block(trip_block_id, patch).await
    }

    pub async fn delete_trip_block(
        &self,
        caller: &Principal,
        trip_block_id: i64,
    ) -> Result<CascadeReport, AppError> {
        let scope = self.store.trip_block_scope(trip_block_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store.delete_trip_block(trip_block_id).await
    }

    // --- activities ----------------------------------------------------

    pub async fn create_activity(
        &self,
        caller: &Principal,
        trip_block_id: i64,
        new_activity: NewActivity,
    ) -> Result<Activity, AppError> {
        let scope = self.store.trip_block_scope(trip_block_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store
            .create_activity(new_activity.into_activity(trip_block_id))
            .await
    }

    pub async fn get_activity(
        &self,
        caller: &Principal,
        activity_id: i64,
    ) -> Result<Activity, AppError> {
        let scope = self.store.activity_scope(activity_id).await?;
        caller.authorize_owner(scope.owner_user_id)?;
        self.store.get_activity(activity_id).await
    }

    pub async fn list_activities(
        &self,
        caller: &Principal,
        trip_block_id: i64,
    ) -> Result<Vec<Activity>, AppError> {
        let scope = self.store.trip_block_scope(trip_block_id).await?;
        caller.authorize_owner(scope.owner_user_id)?;
        self.store.list_activities(trip_block_id).await
    }

    pub async fn update_activity(
        &self,
        caller: &Principal,
        activity_id: i64,
        patch: ActivityPatch,
    ) -> Result<Activity, AppError> {
        let scope = self.store.activity_scope(activity_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store.update_activity(activity_id, patch).await
    }

    pub async fn delete_activity(
        &self,
        caller: &Principal,
        activity_id: i64,
    ) -> Result<CascadeReport, AppError> {
        let scope = self.store.activity_scope(activity_id).await?;
        let _guard = self.lock_scope(caller, scope).await?;
        self.store.delete_activity(activity_id).await
    }
}
