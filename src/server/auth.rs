//! Authentication
//!
//! Users are stored in the engine itself, one record per user under the
//! reserved `__users__:` prefix. Requests to `/keys` authenticate with HTTP
//! Basic credentials checked against the stored Argon2 hash.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::Json;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::KvError;

use super::error::ApiError;
use super::AppState;

/// Key prefix reserved for user records
pub const USER_KEY_PREFIX: &str = "__users__:";

/// Shortest accepted password, in characters
pub const MIN_PASSWORD_LEN: usize = 4;

/// Whether a key lives in the reserved namespace
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(USER_KEY_PREFIX)
}

/// Storage key of a user's record
pub fn user_key(username: &str) -> String {
    format!("{}{}", USER_KEY_PREFIX, username)
}

/// Body of register/login requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Body of successful auth responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub username: String,
    pub success: bool,
    pub message: String,
}

impl AuthResponse {
    fn new(username: &str, message: String) -> Self {
        Self {
            username: username.to_string(),
            success: true,
            message,
        }
    }
}

/// Persisted user record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    username: String,
    password_hash: String,
}

/// An authenticated caller, extracted from the `Authorization` header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

        let credentials = decode_basic(authorization).ok_or_else(|| ApiError::unauthorized("Invalid authorization header"))?;

        if verify_user(state, &credentials)? {
            Ok(AuthUser {
                username: credentials.username,
            })
        } else {
            Err(ApiError::unauthorized("Invalid username or password"))
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = credentials.username.as_str();

    if username.trim().is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if username.contains(':') {
        return Err(ApiError::bad_request("Username cannot contain ':'"));
    }
    if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let key = user_key(username);
    if state.engine().lock().exists(&key)? {
        return Err(ApiError::conflict(format!("User '{}' already exists", username)));
    }

    // Hash outside the lock, then re-check under it
    let record = UserRecord {
        username: username.to_string(),
        password_hash: hash_password(&credentials.password)?,
    };
    let record = serde_json::to_value(&record).map_err(KvError::from)?;

    let mut engine = state.engine().lock();
    if engine.exists(&key)? {
        return Err(ApiError::conflict(format!("User '{}' already exists", username)));
    }
    engine.set(&key, record)?;
    drop(engine);

    tracing::info!("Registered user {}", username);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(
            username,
            format!("User '{}' registered successfully", username),
        )),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AuthResponse>, ApiError> {
    if !verify_user(&state, &credentials)? {
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    Ok(Json(AuthResponse::new(
        &credentials.username,
        "Login successful".to_string(),
    )))
}

/// GET /auth/me
pub async fn me(user: AuthUser) -> Json<AuthResponse> {
    let message = format!("Authenticated as '{}'", user.username);
    Json(AuthResponse::new(&user.username, message))
}

// =============================================================================
// Private Helpers
// =============================================================================

/// Check credentials against the stored record
///
/// The engine is locked only to fetch the record, not while verifying.
fn verify_user(state: &AppState, credentials: &Credentials) -> Result<bool, ApiError> {
    let stored = state.engine().lock().get(&user_key(&credentials.username));
    let record = match stored {
        Ok(value) => value,
        Err(e) if e.is_not_found() => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    let record: UserRecord = match serde_json::from_value(record) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Malformed user record for {}: {}", credentials.username, e);
            return Ok(false);
        }
    };

    verify_password(&credentials.password, &record.password_hash)
}

/// Decode `Basic base64(username:password)`
fn decode_basic(header: &str) -> Option<Credentials> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ApiError::internal(format!("invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::internal(format!(
            "password verification failed: {}",
            e
        ))),
    }
}
