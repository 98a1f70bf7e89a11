pub mod admin;
pub mod catalog;
pub mod public;
pub mod trips;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(public::router())
        .merge(trips::router())
        .nest("/catalog", catalog::router())
        .nest("/admin", admin::router());

    Router::new()
        .nest("/api", api)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
