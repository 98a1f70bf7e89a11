use crate::{
    auth::JwtGate,
    config::AppConfig,
    db::DbPool,
    services::{catalog::CatalogService, hierarchy::HierarchyService},
};

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub gate: JwtGate,
    pub trips: HierarchyService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(config: &AppConfig, db: DbPool) -> Self {
        let gate = JwtGate::new(config.jwt_secret.clone(), config.token_ttl_secs);
        Self {
            trips: HierarchyService::new(db.clone()),
            catalog: CatalogService::new(db.clone()),
            db,
            gate,
        }
    }
}
