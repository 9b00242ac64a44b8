use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{
        DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
    },
};
use tracing::Level;

use common::types::Health;
use service::EntryStore;

use crate::errors::ApiError;

/// Adapter handle shared by all request handlers.
pub type SharedStore = Arc<dyn EntryStore>;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Route shape for entry names: `\w+`, same set the original path pattern
/// accepted. Anything else is treated as a route miss, not a bad request.
fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

async fn list_entries(State(store): State<SharedStore>) -> Result<Json<Vec<String>>, ApiError> {
    let names = store.list().await?;
    Ok(Json(names))
}

async fn get_entry(
    State(store): State<SharedStore>,
    Path(name): Path<String>,
) -> Result<String, ApiError> {
    if !valid_name(&name) {
        return Err(ApiError::NotFound);
    }
    let value = store.get(&name).await?;
    Ok(value)
}

async fn put_entry(
    State(store): State<SharedStore>,
    Path(name): Path<String>,
    value: String,
) -> Result<StatusCode, ApiError> {
    if !valid_name(&name) {
        return Err(ApiError::NotFound);
    }
    store.put(&name, &value).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the full application router: entry API, health, and static assets.
pub fn build_router(store: SharedStore, cors: CorsLayer) -> Router {
    let static_dir = ServeDir::new("static").fallback(ServeFile::new("static/index.html"));

    let api = Router::new()
        .route("/", get(list_entries))
        .route("/:name", get(get_entry).put(put_entry));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .fallback_service(static_dir)
        .with_state(store)
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
