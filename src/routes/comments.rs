use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{CommentAuthor, CommentView, NewComment};
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;
use crate::threading::thread_comments;

const MAX_COMMENT_CHARS: usize = 2000;

// --- Forms ---

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub threaded: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub story_id: i64,
    pub chapter_id: Option<i64>,
    pub content: String,
    pub parent_id: Option<i64>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories/{id}/comments", get(story_comments))
        .route("/chapters/{id}/comments", get(chapter_comments))
        .route("/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
}

// --- Handlers ---

async fn story_comments(
    State(state): State<AppState>,
    Path(story_id): Path<i64>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    if state.store.get_story(story_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let comments = state.store.list_story_comments(story_id).await?;
    Ok(render(comments, params.threaded))
}

async fn chapter_comments(
    State(state): State<AppState>,
    Path(chapter_id): Path<i64>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    if state.store.get_chapter(chapter_id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let comments = state.store.list_chapter_comments(chapter_id).await?;
    Ok(render(comments, params.threaded))
}

fn render(comments: Vec<CommentView>, threaded: bool) -> Response {
    if threaded {
        Json(thread_comments(comments)).into_response()
    } else {
        Json(comments).into_response()
    }
}

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> AppResult<Response> {
    let content = req.content.trim().to_string();
    let mut errors = Vec::new();
    if content.is_empty() {
        errors.push(FieldError::new("content", "cannot be empty"));
    } else if content.chars().count() > MAX_COMMENT_CHARS {
        errors.push(FieldError::new(
            "content",
            format!("must be {} characters or less", MAX_COMMENT_CHARS),
        ));
    }

    if state.store.get_story(req.story_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    if let Some(chapter_id) = req.chapter_id {
        match state.store.get_chapter(chapter_id).await? {
            Some(chapter) if chapter.story_id == req.story_id => {}
            Some(_) => errors.push(FieldError::new(
                "chapter_id",
                "does not belong to this story",
            )),
            None => errors.push(FieldError::new("chapter_id", "does not exist")),
        }
    }

    // Replies nest one level deep: the parent must itself be top-level.
    if let Some(parent_id) = req.parent_id {
        match state.store.get_comment(parent_id).await? {
            Some(parent) if parent.story_id != req.story_id => errors.push(FieldError::new(
                "parent_id",
                "belongs to a different story",
            )),
            Some(parent) if parent.parent_id.is_some() => errors.push(FieldError::new(
                "parent_id",
                "replies cannot be replied to",
            )),
            Some(_) => {}
            None => errors.push(FieldError::new("parent_id", "does not exist")),
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let comment = state
        .store
        .create_comment(NewComment {
            user_id: user.id,
            story_id: req.story_id,
            chapter_id: req.chapter_id,
            parent_id: req.parent_id,
            content,
        })
        .await?;

    let view = CommentView {
        comment,
        user: CommentAuthor {
            id: user.id,
            username: user.username,
        },
    };
    Ok((StatusCode::CREATED, Json(view)).into_response())
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let comment = state.store.get_comment(id).await?.ok_or(AppError::NotFound)?;

    if comment.user_id != user.id && !user.is_admin {
        return Err(AppError::Forbidden);
    }

    state.store.delete_comment(id).await?;
    tracing::info!(comment_id = id, by = user.id, "Deleted comment");
    Ok(Json(json!({ "deleted": true })).into_response())
}
