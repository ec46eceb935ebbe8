use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{extract::State, response::IntoResponse, Extension, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use crflash_db::Database;
use crflash_types::api::{Claims, LoginRequest, LoginResponse};
use crflash_types::models::{Role, User};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("email and password are required".into()));
    }

    // Unknown email and wrong password are indistinguishable to the caller.
    let row = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&row.password, &req.password) {
        return Err(ApiError::InvalidCredentials);
    }

    let user = user_from_row(row)?;
    let token = create_token(&state.jwt_secret, &user)?;

    Ok(Json(LoginResponse { token, user }))
}

/// The caller's own account, refreshed from the store rather than echoed
/// from the token: a deleted account answers 404 even with a live token.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(user_from_row(row)?))
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn user_from_row(row: crflash_db::models::UserRow) -> Result<User, ApiError> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|_| ApiError::Upstream(anyhow!("corrupt user id: {}", row.id)))?;
    let role = Role::parse(&row.role)
        .ok_or_else(|| ApiError::Upstream(anyhow!("corrupt user role: {}", row.role)))?;

    Ok(User {
        id,
        name: row.name,
        email: row.email,
        role,
    })
}

fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + chrono::Duration::hours(24)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
