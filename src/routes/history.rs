use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::{HistoryEntry, ReadingProgress};
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordProgressRequest {
    pub story_id: i64,
    pub chapter_id: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/reading-history",
            get(list_history).post(record_progress).delete(clear_history),
        )
        .route("/reading-history/{story_id}", delete(remove_history))
}

async fn list_history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.store.list_progress(user.id).await?))
}

async fn record_progress(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<RecordProgressRequest>,
) -> AppResult<Json<ReadingProgress>> {
    if state.store.get_story(req.story_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let chapter = state
        .store
        .get_chapter(req.chapter_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if chapter.story_id != req.story_id {
        return Err(AppError::Validation(vec![FieldError::new(
            "chapter_id",
            "does not belong to this story",
        )]));
    }

    let record = state
        .store
        .record_progress(user.id, req.story_id, req.chapter_id)
        .await?;
    Ok(Json(record))
}

async fn remove_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(story_id): Path<i64>,
) -> AppResult<Json<Value>> {
    if !state.store.remove_progress(user.id, story_id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "removed": true })))
}

async fn clear_history(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Value>> {
    let removed = state.store.clear_progress(user.id).await?;
    tracing::debug!(user_id = user.id, removed, "Cleared reading history");
    Ok(Json(json!({ "removed": removed })))
}
