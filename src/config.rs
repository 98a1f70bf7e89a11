use std::{env, net::SocketAddr};

use crate::error::AppError;

const DEV_JWT_SECRET: &str = "dev-only-voyage-secret-change-me-please-0123456789";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://voyage.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string());
        if jwt_secret.len() < 32 {
            return Err(AppError::Config(
                "JWT_SECRET must be at least 32 characters".into(),
            ));
        }

        let token_ttl_secs = match env::var("TOKEN_TTL_SECS") {
            Ok(raw) => raw
                .parse()
                .map_err(|err| AppError::Config(format!("invalid TOKEN_TTL_SECS: {err}")))?,
            Err(_) => 24 * 60 * 60,
        };

        let admin_username = env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            listen_addr,
            jwt_secret,
            token_ttl_secs,
            admin_username,
            admin_password,
        })
    }
}
