use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::sync::OnceLock;

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        require_text,
        user::{NewUser, User, UserRole},
    },
    state::AppState,
};

/// The acting identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins may act on anything; everyone else only on what they own.
    pub fn authorize_owner(&self, owner_user_id: i64) -> Result<(), AppError> {
        if self.is_admin() || self.user_id == owner_user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role(),
        }
    }
}

/// Turns an opaque session token into a principal.
pub trait AccessGate: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Principal, AppError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: UserRole,
    pub iat: u64,
    pub exp: u64,
}

/// HS256 bearer tokens carrying identity and role claims.
#[derive(Clone)]
pub struct JwtGate {
    secret: String,
    ttl_secs: u64,
}

impl JwtGate {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| AppError::Other(anyhow::anyhow!("failed to sign token: {err}")))
    }
}

impl AccessGate for JwtGate {
    fn resolve(&self, token: &str) -> Result<Principal, AppError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => debug!("rejected expired token"),
                _ => warn!("rejected token: {err}"),
            }
            AppError::Unauthorized
        })?;

        let user_id = data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized)?;
        Ok(Principal {
            user_id,
            username: data.claims.username,
            role: data.claims.role,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header =
            Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
                .await
                .unwrap_or(None);
        let Some(TypedHeader(Authorization(bearer))) = header else {
            return Ok(Self(None));
        };
        let principal = state.gate.resolve(bearer.token())?;
        Ok(Self(Some(principal)))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&Principal, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn require_admin(&self) -> Result<&Principal, AppError> {
        let user = self.require_user()?;
        user.require_admin()?;
        Ok(user)
    }
}

const USER_COLUMNS: &str =
    "id, uuid, username, email, full_name, password_hash, role, created_at, last_login_at";

pub async fn register_user(db: &DbPool, new_user: NewUser) -> Result<User, AppError> {
    require_text("username", &new_user.username)?;
    require_text("email", &new_user.email)?;
    require_text("password", &new_user.password)?;

    let username = new_user.username.trim();
    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?1")
        .bind(username)
        .fetch_optional(db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(format!(
            "username {username:?} is already taken"
        )));
    }

    let password_hash = hash_password(&new_user.password)?;
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (uuid, username, email, full_name, password_hash, role, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) RETURNING {USER_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(new_user.email.trim())
    .bind(new_user.full_name.trim())
    .bind(password_hash)
    .bind(UserRole::User.as_str())
    .bind(Utc::now())
    .fetch_one(db)
    .await?;

    info!(user_id = user.id, "registered user {}", user.username);
    Ok(user)
}

pub async fn authenticate_user(
    db: &DbPool,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
    ))
    .bind(username.trim())
    .fetch_optional(db)
    .await?;

    // Unknown accounts cost one verification, same as a wrong password.
    let Some(user) = user else {
        verify_password(password, dummy_hash()?)?;
        debug!("login for unknown account");
        return Err(AppError::Unauthorized);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!("failed login for {}", user.username);
        return Err(AppError::Unauthorized);
    }

    let now = Utc::now();
    sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(user.id)
        .execute(db)
        .await?;

    Ok(User {
        last_login_at: Some(now),
        ..user
    })
}

/// Creates the account if missing and makes sure it carries the ADMIN role.
pub async fn ensure_admin(db: &DbPool, username: &str, password: &str) -> Result<User, AppError> {
    let existing = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
    ))
    .bind(username)
    .fetch_optional(db)
    .await?;

    let user = match existing {
        Some(user) => user,
        None => {
            register_user(
                db,
                NewUser {
                    username: username.to_string(),
                    email: format!("{username}@localhost"),
                    full_name: "Administrator".into(),
                    password: password.to_string(),
                },
            )
            .await?
        }
    };
    set_role(db, user.id, UserRole::Admin).await
}

pub async fn set_role(db: &DbPool, user_id: i64, role: UserRole) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET role = ?1 WHERE id = ?2 RETURNING {USER_COLUMNS}"
    ))
    .bind(role.as_str())
    .bind(user_id)
    .fetch_optional(db)
    .await?
    .ok_or(AppError::NotFound)?;
    info!(user_id, "role set to {role}");
    Ok(user)
}

pub async fn list_users(db: &DbPool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(users)
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))
}

fn dummy_hash() -> Result<&'static str, AppError> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash);
    }
    let hash = hash_password("voyage-unknown-account")?;
    Ok(DUMMY.get_or_init(|| hash))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|err| AppError::Other(anyhow::anyhow!("stored hash unreadable: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            uuid: Uuid::new_v4().to_string(),
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            full_name: String::new(),
            password_hash: String::new(),
            role: role.as_str().into(),
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    const SECRET: &str = "unit-test-secret-unit-test-secret-0001";

    #[test]
    fn issued_token_resolves_to_its_claims() {
        let gate = JwtGate::new(SECRET, 60);
        let token = gate.issue(&user(7, UserRole::Admin)).unwrap();
        let principal = gate.resolve(&token).unwrap();
        assert_eq!(principal.user_id, 7);
        assert_eq!(principal.role, UserRole::Admin);
        assert_eq!(principal.username, "user7");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = JwtGate::new(SECRET, 60)
            .issue(&user(1, UserRole::User))
            .unwrap();
        let other = JwtGate::new("another-secret-another-secret-another", 60);
        assert!(matches!(other.resolve(&token), Err(AppError::Unauthorized)));
        assert!(matches!(other.resolve("garbage"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn owner_check_lets_admins_through() {
        let owner = Principal {
            user_id: 1,
            username: "a".into(),
            role: UserRole::User,
        };
        let stranger = Principal {
            user_id: 2,
            ..owner.clone()
        };
        let admin = Principal {
            user_id: 3,
            role: UserRole::Admin,
            ..owner.clone()
        };
        assert!(owner.authorize_owner(1).is_ok());
        assert!(matches!(stranger.authorize_owner(1), Err(AppError::Forbidden)));
        assert!(admin.authorize_owner(1).is_ok());
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        let hash = dummy_hash().unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(std::ptr::eq(hash, dummy_hash().unwrap()));
        assert!(!verify_password("correct-horse", hash).unwrap());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }
}
