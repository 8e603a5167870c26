use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use service::errors::ServiceError;

/// Boundary error taxonomy. The display string is the wire `mensaje`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Debe proporcionar un ID valido (solo se aceptan numeros)")]
    InvalidId,
    #[error("No se encontró ningún usuario con el ID proporcionado")]
    NotFound,
    #[error("Debe proporcionar al menos un dato para crear un nuevo usuario")]
    EmptyBody,
    #[error("Debe proporcionar un ID para eliminar un usuario")]
    MissingId,
    #[error(transparent)]
    Store(#[from] ServiceError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidId | Self::EmptyBody | Self::MissingId => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = self.to_string();
        if status.is_server_error() {
            error!(error = %msg, "store access failed");
        }
        (status, Json(serde_json::json!({"mensaje": msg}))).into_response()
    }
}
