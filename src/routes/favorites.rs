use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::FavoriteEntry;
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub story_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/{story_id}", delete(remove_favorite))
}

async fn list_favorites(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<FavoriteEntry>>> {
    Ok(Json(state.store.list_favorites(user.id).await?))
}

async fn add_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<AddFavoriteRequest>,
) -> AppResult<Response> {
    if state.store.get_story(req.story_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    // A second add for the same pair comes back as Conflict → 400.
    let favorite = state.store.add_favorite(user.id, req.story_id).await?;
    Ok((StatusCode::CREATED, Json(favorite)).into_response())
}

async fn remove_favorite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(story_id): Path<i64>,
) -> AppResult<Json<serde_json::Value>> {
    if !state.store.remove_favorite(user.id, story_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "removed": true })))
}
