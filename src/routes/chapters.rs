use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::models::{Chapter, Story};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ChapterView {
    pub chapter: Chapter,
    pub story: Story,
    pub prev_chapter_id: Option<i64>,
    pub next_chapter_id: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/chapters/{id}", get(get_chapter))
}

async fn get_chapter(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ChapterView>> {
    let chapter = state.store.get_chapter(id).await?.ok_or(AppError::NotFound)?;
    let story = state
        .store
        .get_story(chapter.story_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let siblings: Vec<i64> = state
        .store
        .list_chapters(story.id)
        .await?
        .iter()
        .map(|c| c.id)
        .collect();
    let (prev_chapter_id, next_chapter_id) = neighbours(&siblings, chapter.id);

    Ok(Json(ChapterView {
        chapter,
        story,
        prev_chapter_id,
        next_chapter_id,
    }))
}

/// Previous and next ids around `id` in reading order.
fn neighbours(ordered: &[i64], id: i64) -> (Option<i64>, Option<i64>) {
    match ordered.iter().position(|&c| c == id) {
        Some(pos) => (
            pos.checked_sub(1).map(|p| ordered[p]),
            ordered.get(pos + 1).copied(),
        ),
        None => (None, None),
    }
}
