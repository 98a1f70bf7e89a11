use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        catalog::CatalogActivity,
        user::{User, UserRole},
    },
    services::catalog::IngestMode,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users_list))
        .route("/users/:id/role", post(update_user_role))
        .route("/catalog/upload", post(catalog_upload))
}

async fn users_list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<User>>, AppError> {
    current.require_admin()?;
    Ok(Json(auth::list_users(&state.db).await?))
}

#[derive(Deserialize)]
struct RoleForm {
    role: String,
}

async fn update_user_role(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(form): ApiJson<RoleForm>,
) -> Result<Json<User>, AppError> {
    let admin = current.require_admin()?;
    let role: UserRole = form.role.parse()?;
    let user = auth::set_role(&state.db, user_id, role).await?;
    info!(by = admin.user_id, user_id, "role changed to {role}");
    Ok(Json(user))
}

#[derive(Deserialize)]
struct UploadQuery {
    #[serde(default)]
    mode: IngestMode,
}

async fn catalog_upload(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<UploadQuery>,
    body: Bytes,
) -> Result<Json<Vec<CatalogActivity>>, AppError> {
    current.require_admin()?;
    let saved = state.catalog.ingest_csv(&body, query.mode).await?;
    Ok(Json(saved))
}
