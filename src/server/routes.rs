//! Key-value handlers
//!
//! CRUD over `/keys`. Every handler requires an authenticated caller and
//! refuses keys in the reserved user namespace.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::auth::{is_reserved_key, AuthUser};
use super::error::ApiError;
use super::AppState;

/// A key/value pair as sent and returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvEntry {
    pub key: String,

    #[serde(default)]
    pub value: Value,

    #[serde(default = "default_success")]
    pub success: bool,
}

impl KvEntry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            success: true,
        }
    }
}

fn default_success() -> bool {
    true
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the KVStorage API" }))
}

/// GET /keys
///
/// Every public pair, sorted by key
pub async fn list_keys(_user: AuthUser, State(state): State<AppState>) -> Result<Json<Vec<KvEntry>>, ApiError> {
    let mut engine = state.engine().lock();

    let mut entries: Vec<KvEntry> = engine
        .items()?
        .into_iter()
        .filter(|(key, _)| !is_reserved_key(key))
        .map(|(key, value)| KvEntry::new(key, value))
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(Json(entries))
}

/// GET /keys/{key}
pub async fn get_key(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<KvEntry>, ApiError> {
    reject_reserved(&key)?;

    let value = state.engine().lock().get(&key)?;
    Ok(Json(KvEntry::new(key, value)))
}

/// POST /keys
pub async fn create_key(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(entry): Json<KvEntry>,
) -> Result<(StatusCode, Json<KvEntry>), ApiError> {
    reject_reserved(&entry.key)?;

    let mut engine = state.engine().lock();
    if engine.exists(&entry.key)? {
        return Err(ApiError::conflict(format!("Key '{}' already exists", entry.key)));
    }
    engine.set(&entry.key, entry.value.clone())?;

    Ok((StatusCode::CREATED, Json(KvEntry::new(entry.key, entry.value))))
}

/// PUT /keys/{key}
pub async fn update_key(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(entry): Json<KvEntry>,
) -> Result<Json<KvEntry>, ApiError> {
    if key != entry.key {
        return Err(ApiError::bad_request("Key in URL must match key in request body"));
    }
    reject_reserved(&key)?;

    let mut engine = state.engine().lock();
    if !engine.exists(&key)? {
        return Err(ApiError::not_found(format!("Key '{}' not found", key)));
    }
    engine.set(&key, entry.value.clone())?;

    Ok(Json(KvEntry::new(key, entry.value)))
}

/// DELETE /keys/{key}
pub async fn delete_key(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    reject_reserved(&key)?;

    match state.engine().lock().delete(&key)? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::not_found(format!("Key '{}' not found", key))),
    }
}

fn reject_reserved(key: &str) -> Result<(), ApiError> {
    if is_reserved_key(key) {
        return Err(ApiError::forbidden("Access to internal keys is forbidden"));
    }
    Ok(())
}
