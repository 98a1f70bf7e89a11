use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{
    auth::CurrentUser,
    error::AppError,
    extract::{ApiJson, ApiPath},
    models::{
        activity::{Activity, ActivityPatch, NewActivity},
        itinerary::{Itinerary, ItineraryPatch, NewItinerary},
        trip::{NewTrip, Trip, TripDetail, TripPatch},
        trip_block::{NewTripBlock, TripBlock, TripBlockPatch},
        CascadeReport,
    },
    state::AppState,
};

type Created<T> = (StatusCode, Json<T>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(trips_list).post(trip_create))
        .route(
            "/trips/:id",
            get(trip_detail).put(trip_update).delete(trip_delete),
        )
        .route(
            "/trips/:id/itinerary",
            get(itinerary_for_trip).post(itinerary_create),
        )
        .route(
            "/itineraries/:id",
            get(itinerary_detail)
                .put(itinerary_update)
                .delete(itinerary_delete),
        )
        .route(
            "/itineraries/:id/trip-blocks",
            get(trip_blocks_list).post(trip_block_create),
        )
        .route(
            "/trip-blocks/:id",
            get(trip_block_detail)
                .put(trip_block_update)
                .delete(trip_block_delete),
        )
        .route(
            "/trip-blocks/:id/activities",
            get(activities_list).post(activity_create),
        )
        .route(
            "/activities/:id",
            get(activity_detail)
                .put(activity_update)
                .delete(activity_delete),
        )
}

async fn trips_list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Trip>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.list_trips_for_user(user).await?))
}

async fn trip_create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(form): ApiJson<NewTrip>,
) -> Result<Created<Trip>, AppError> {
    let user = current.require_user()?;
    let trip = state.trips.create_trip(user, form).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn trip_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
) -> Result<Json<TripDetail>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.trip_detail(user, trip_id).await?))
}

async fn trip_update(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<TripPatch>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.update_trip(user, trip_id, patch).await?))
}

async fn trip_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
) -> Result<Json<CascadeReport>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.delete_trip(user, trip_id).await?))
}

async fn itinerary_for_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
) -> Result<Json<Itinerary>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.itinerary_for_trip(user, trip_id).await?))
}

async fn itinerary_create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_id): ApiPath<i64>,
    ApiJson(form): ApiJson<NewItinerary>,
) -> Result<Created<Itinerary>, AppError> {
    let user = current.require_user()?;
    let itinerary = state.trips.create_itinerary(user, trip_id, form).await?;
    Ok((StatusCode::CREATED, Json(itinerary)))
}

async fn itinerary_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(itinerary_id): ApiPath<i64>,
) -> Result<Json<Itinerary>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.get_itinerary(user, itinerary_id).await?))
}

async fn itinerary_update(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(itinerary_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ItineraryPatch>,
) -> Result<Json<Itinerary>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        state
            .trips
            .update_itinerary(user, itinerary_id, patch)
            .await?,
    ))
}

async fn itinerary_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(itinerary_id): ApiPath<i64>,
) -> Result<Json<CascadeReport>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.delete_itinerary(user, itinerary_id).await?))
}

async fn trip_blocks_list(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(itinerary_id): ApiPath<i64>,
) -> Result<Json<Vec<TripBlock>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.list_trip_blocks(user, itinerary_id).await?))
}

async fn trip_block_create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(itinerary_id): ApiPath<i64>,
    ApiJson(form): ApiJson<NewTripBlock>,
) -> Result<Created<TripBlock>, AppError> {
    let user = current.require_user()?;
    let block = state
        .trips
        .create_trip_block(user, itinerary_id, form)
        .await?;
    Ok((StatusCode::CREATED, Json(block)))
}

async fn trip_block_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_block_id): ApiPath<i64>,
) -> Result<Json<TripBlock>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.get_trip_block(user, trip_block_id).await?))
}

async fn trip_block_update(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_block_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<TripBlockPatch>,
) -> Result<Json<TripBlock>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        state
            .trips
            .update_trip_block(user, trip_block_id, patch)
            .await?,
    ))
}

async fn trip_block_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_block_id): ApiPath<i64>,
) -> Result<Json<CascadeReport>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        state.trips.delete_trip_block(user, trip_block_id).await?,
    ))
}

async fn activities_list(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_block_id): ApiPath<i64>,
) -> Result<Json<Vec<Activity>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.list_activities(user, trip_block_id).await?))
}

async fn activity_create(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(trip_block_id): ApiPath<i64>,
    ApiJson(form): ApiJson<NewActivity>,
) -> Result<Created<Activity>, AppError> {
    let user = current.require_user()?;
    let activity = state
        .trips
        .create_activity(user, trip_block_id, form)
        .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn activity_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(activity_id): ApiPath<i64>,
) -> Result<Json<Activity>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.get_activity(user, activity_id).await?))
}

async fn activity_update(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(activity_id): ApiPath<i64>,
    ApiJson(patch): ApiJson<ActivityPatch>,
) -> Result<Json<Activity>, AppError> {
    let user = current.require_user()?;
    Ok(Json(
        state
            .trips
            .update_activity(user, activity_id, patch)
            .await?,
    ))
}

async fn activity_delete(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(activity_id): ApiPath<i64>,
) -> Result<Json<CascadeReport>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.trips.delete_activity(user, activity_id).await?))
}
