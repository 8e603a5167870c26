use axum::{routing::get, Json, Router};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

pub mod usuarios;

pub async fn welcome() -> &'static str {
    "Bienvenido a la API!"
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Build the full application router: welcome, health, and usuarios CRUD.
pub fn build_router(state: usuarios::ServerState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .route(
            "/usuarios",
            get(usuarios::list_usuarios)
                .post(usuarios::create_usuario)
                .delete(usuarios::delete_without_id),
        )
        .route(
            "/usuarios/:id",
            get(usuarios::get_usuario)
                .put(usuarios::update_usuario)
                .delete(usuarios::delete_usuario),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .include_headers(false),
                )
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
