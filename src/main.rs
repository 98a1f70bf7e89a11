use tokio::net::TcpListener;
use tracing::info;
use voyage::auth;
use voyage::config::AppConfig;
use voyage::db::{init_pool, run_migrations};
use voyage::error::AppError;
use voyage::routes::create_router;
use voyage::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let admin = auth::ensure_admin(&db, username, password).await?;
        info!("admin account ready: {}", admin.username);
    }

    let state = AppState::new(&config, db);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,voyage=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
