use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Map, Value};

use service::errors::ServiceError;
use service::file::user_store::{User, UserStore};

use crate::errors::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<UserStore>,
}

/// Path ids arrive as raw strings so a non-integer segment maps to the
/// service's own JSON 400 instead of the framework rejection.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::InvalidId)
}

/// List all users.
pub async fn list_usuarios(State(state): State<ServerState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

/// Fetch one user by numeric id.
pub async fn get_usuario(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.get(id).await? {
        Some(usuario) => Ok(Json(usuario)),
        None => Err(ApiError::NotFound),
    }
}

/// Create a user under the next available id. An absent or non-object
/// body counts as empty.
pub async fn create_usuario(
    State(state): State<ServerState>,
    body: Option<Json<Map<String, Value>>>,
) -> Result<Json<User>, ApiError> {
    let fields = body.map(|Json(b)| b).unwrap_or_default();
    state
        .store
        .create(fields)
        .await
        .map(Json)
        .map_err(|e| match e {
            ServiceError::Validation(_) => ApiError::EmptyBody,
            other => ApiError::Store(other),
        })
}

/// Shallow-merge the body fields into an existing user.
pub async fn update_usuario(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    body: Option<Json<Map<String, Value>>>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let fields = body.map(|Json(b)| b).unwrap_or_default();
    let usuario = state
        .store
        .update(id, fields)
        .await
        .map_err(|e| match e {
            ServiceError::NotFound(_) => ApiError::NotFound,
            other => ApiError::Store(other),
        })?;
    Ok(Json(json!({
        "mensaje": "El usuario se actualizo correctamente",
        "usuario": usuario,
    })))
}

/// Remove a user, freeing its id for reuse.
pub async fn delete_usuario(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    state.store.delete(id).await.map_err(|e| match e {
        ServiceError::NotFound(_) => ApiError::NotFound,
        other => ApiError::Store(other),
    })?;
    Ok(Json(json!({"mensaje": "El usuario se elimino correctamente"})))
}

/// `DELETE /usuarios` without an id segment gets its own message.
pub async fn delete_without_id() -> ApiError {
    ApiError::MissingId
}
