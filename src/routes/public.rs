use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{
    auth,
    error::AppError,
    extract::ApiJson,
    models::user::{NewUser, User},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_submit))
        .route("/login", post(login_submit))
}

#[derive(Serialize)]
struct SessionResponse {
    user: User,
    token: String,
}

async fn register_submit(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = auth::register_user(&state.db, form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = auth::authenticate_user(&state.db, &form.username, &form.password).await?;
    let token = state.gate.issue(&user)?;
    Ok(Json(SessionResponse { user, token }))
}
