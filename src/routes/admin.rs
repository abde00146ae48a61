use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::{ChapterContent, ChapterInput, StoryInput, StoryKind};
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::{AdminUser, ApiJson};
use crate::forms::{self, FormSchema};
use crate::state::AppState;

/// Flat chapter body as the admin form submits it.
#[derive(Debug, Deserialize)]
pub struct ChapterForm {
    pub number: i64,
    pub title: String,
    pub content_type: String,
    pub body: Option<String>,
    pub pages: Option<Vec<String>>,
}

impl ChapterForm {
    fn into_input(self) -> Result<ChapterInput, AppError> {
        let body = self.body.filter(|b| !b.trim().is_empty());
        let content = match self.content_type.as_str() {
            "novel" | "oneshot" => {
                let Some(body) = body else {
                    return Err(field("body", "is required for prose chapters"));
                };
                if self.content_type == "novel" {
                    ChapterContent::Novel { body }
                } else {
                    ChapterContent::Oneshot { body }
                }
            }
            "comic" => {
                let pages: Vec<String> = self
                    .pages
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                if pages.is_empty() {
                    return Err(field("pages", "a comic chapter needs at least one page"));
                }
                ChapterContent::Comic { pages }
            }
            other => {
                return Err(field(
                    "content_type",
                    format!("unknown content type '{}'", other),
                ))
            }
        };

        Ok(ChapterInput {
            number: self.number,
            title: self.title.trim().to_string(),
            content,
        })
    }
}

fn field(name: &str, message: impl Into<String>) -> AppError {
    AppError::Validation(vec![FieldError::new(name, message)])
}

/// Schema check first, then typed deserialisation.
fn parse_with<T: serde::de::DeserializeOwned>(schema: &FormSchema, mut body: Value) -> AppResult<T> {
    schema.validate(&body).map_err(AppError::Validation)?;
    if let Some(object) = body.as_object_mut() {
        object.retain(|_, v| !v.is_null());
    }
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn normalize_story(mut input: StoryInput) -> StoryInput {
    input.title = input.title.trim().to_string();
    input.author = input.author.trim().to_string();
    input.description = input.description.trim().to_string();
    input.cover_url = input
        .cover_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let mut seen = HashSet::new();
    input.genres.retain(|g| seen.insert(g.clone()));
    input
}

fn content_must_fit(content: &ChapterContent, kind: StoryKind) -> AppResult<()> {
    if content.fits(kind) {
        Ok(())
    } else {
        Err(field(
            "content_type",
            format!(
                "{} chapters cannot be added to a {} story",
                content.content_type(),
                kind.as_str()
            ),
        ))
    }
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/forms/{entity}", get(form_schema))
        .route("/admin/stories", post(create_story))
        .route(
            "/admin/stories/{id}",
            put(update_story).delete(delete_story),
        )
        .route("/admin/stories/{id}/chapters", post(create_chapter))
        .route(
            "/admin/chapters/{id}",
            put(update_chapter).delete(delete_chapter),
        )
}

// --- Handlers ---

async fn form_schema(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(entity): Path<String>,
) -> AppResult<Json<FormSchema>> {
    match entity.as_str() {
        "story" => Ok(Json(forms::story_form(&state.config.library.genres))),
        "chapter" => Ok(Json(forms::chapter_form())),
        _ => Err(AppError::NotFound),
    }
}

async fn create_story(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let schema = forms::story_form(&state.config.library.genres);
    let input = normalize_story(parse_with::<StoryInput>(&schema, body)?);

    let story = state.store.create_story(&input).await?;
    tracing::info!(story_id = story.id, by = admin.id, "Created story '{}'", story.title);
    Ok((StatusCode::CREATED, Json(story)).into_response())
}

async fn update_story(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let schema = forms::story_form(&state.config.library.genres);
    let input = normalize_story(parse_with::<StoryInput>(&schema, body)?);

    let existing = state.store.get_story(id).await?.ok_or(AppError::NotFound)?;
    if existing.kind != input.kind {
        let chapters = state.store.list_chapters(id).await?;
        if chapters.iter().any(|c| !c.content.fits(input.kind)) {
            return Err(field(
                "kind",
                "existing chapters do not match the new story type",
            ));
        }
    }

    let story = state
        .store
        .update_story(id, &input)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(story_id = id, by = admin.id, "Updated story");
    Ok(Json(story).into_response())
}

async fn delete_story(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    if !state.store.delete_story(id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(story_id = id, by = admin.id, "Deleted story");
    Ok(Json(json!({ "deleted": true })))
}

async fn create_chapter(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(story_id): Path<i64>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let story = state
        .store
        .get_story(story_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let input = parse_with::<ChapterForm>(&forms::chapter_form(), body)?.into_input()?;
    content_must_fit(&input.content, story.kind)?;

    let chapter = state.store.create_chapter(story_id, &input).await?;
    tracing::info!(
        chapter_id = chapter.id,
        story_id,
        by = admin.id,
        "Created chapter {}",
        chapter.number
    );
    Ok((StatusCode::CREATED, Json(chapter)).into_response())
}

async fn update_chapter(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<Value>,
) -> AppResult<Response> {
    let existing = state.store.get_chapter(id).await?.ok_or(AppError::NotFound)?;
    let story = state
        .store
        .get_story(existing.story_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let input = parse_with::<ChapterForm>(&forms::chapter_form(), body)?.into_input()?;
    content_must_fit(&input.content, story.kind)?;

    let chapter = state
        .store
        .update_chapter(id, &input)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(chapter_id = id, by = admin.id, "Updated chapter");
    Ok(Json(chapter).into_response())
}

async fn delete_chapter(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    if !state.store.delete_chapter(id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(chapter_id = id, by = admin.id, "Deleted chapter");
    Ok(Json(json!({ "deleted": true })))
}
