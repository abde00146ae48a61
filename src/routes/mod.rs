pub mod admin;
pub mod auth;
pub mod chapters;
pub mod comments;
pub mod favorites;
pub mod history;
pub mod stories;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface with its middleware.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(stories::router())
        .merge(chapters::router())
        .merge(comments::router())
        .merge(favorites::router())
        .merge(history::router())
        .merge(admin::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
