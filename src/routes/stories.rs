use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::{
    ChapterSummary, Page, ReadingProgress, Story, StoryKind, StoryQuery, StoryStatus,
};
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::MaybeUser;
use crate::state::AppState;

// --- Query / view structs ---

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub q: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub genre: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize)]
pub struct StoryDetail {
    pub story: Story,
    pub chapters: Vec<ChapterSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ReadingProgress>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories", get(list_stories))
        .route("/stories/{id}", get(get_story))
        .route("/stories/{id}/chapters", get(list_chapters))
}

// --- Handlers ---

async fn list_stories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Page<Story>>> {
    let query = build_query(params, state.config.page_size(None), |requested| {
        state.config.page_size(Some(requested))
    })?;
    let page = state.store.list_stories(&query).await?;
    Ok(Json(page))
}

async fn get_story(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> AppResult<Json<StoryDetail>> {
    let story = state.store.get_story(id).await?.ok_or(AppError::NotFound)?;
    let chapters = state
        .store
        .list_chapters(id)
        .await?
        .iter()
        .map(ChapterSummary::from)
        .collect();

    let (is_favorite, progress) = match user {
        Some(user) => (
            Some(state.store.is_favorite(user.id, id).await?),
            state.store.get_progress(user.id, id).await?,
        ),
        None => (None, None),
    };

    Ok(Json(StoryDetail {
        story,
        chapters,
        is_favorite,
        progress,
    }))
}

async fn list_chapters(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<ChapterSummary>>> {
    if state.store.get_story(id).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let chapters = state.store.list_chapters(id).await?;
    Ok(Json(chapters.iter().map(ChapterSummary::from).collect()))
}

// --- Query parsing ---

fn build_query(
    params: ListParams,
    default_per_page: u32,
    clamp_per_page: impl Fn(u32) -> u32,
) -> Result<StoryQuery, AppError> {
    let mut errors = Vec::new();

    let kind = match params.kind.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => StoryKind::parse(s).or_else(|| {
            errors.push(FieldError::new("kind", format!("unknown kind '{}'", s)));
            None
        }),
        None => None,
    };
    let status = match params.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => StoryStatus::parse(s).or_else(|| {
            errors.push(FieldError::new("status", format!("unknown status '{}'", s)));
            None
        }),
        None => None,
    };
    if params.page == Some(0) {
        errors.push(FieldError::new("page", "pages start at 1"));
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(StoryQuery {
        search: non_blank(params.q),
        kind,
        status,
        genre: non_blank(params.genre),
        page: params.page.unwrap_or(1),
        per_page: params.per_page.map_or(default_per_page, clamp_per_page),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(params: ListParams) -> Result<StoryQuery, AppError> {
        build_query(params, 20, |n| n.clamp(1, 100))
    }

    #[test]
    fn empty_params_use_defaults() {
        let query = build(ListParams::default()).unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 20);
        assert!(query.search.is_none());
        assert!(query.kind.is_none());
    }

    #[test]
    fn filters_are_parsed() {
        let query = build(ListParams {
            q: Some("  tide ".into()),
            kind: Some("comic".into()),
            status: Some("completed".into()),
            genre: Some("".into()),
            page: Some(2),
            per_page: Some(1000),
        })
        .unwrap();
        assert_eq!(query.search.as_deref(), Some("tide"));
        assert_eq!(query.kind, Some(StoryKind::Comic));
        assert_eq!(query.status, Some(StoryStatus::Completed));
        assert!(query.genre.is_none());
        assert_eq!(query.page, 2);
        assert_eq!(query.per_page, 100);
    }

    #[test]
    fn bad_filters_are_reported_per_field() {
        let err = build(ListParams {
            kind: Some("poem".into()),
            status: Some("lost".into()),
            page: Some(0),
            ..ListParams::default()
        })
        .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["kind", "status", "page"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
