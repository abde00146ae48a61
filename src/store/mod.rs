// Repository seam: every handler reaches persistence through `Store`.
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::models::*;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // -- Users and sessions --

    /// Fails with `Conflict` when the username is taken. The first account
    /// on an empty store is always created as admin.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn user_count(&self) -> StoreResult<u64>;

    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Resolve a session token to its user, ignoring sessions expired at `now`.
    async fn find_session_user(&self, token: &str, now: DateTime<Utc>)
        -> StoreResult<Option<User>>;

    async fn delete_session(&self, token: &str) -> StoreResult<bool>;

    // -- Stories --

    async fn list_stories(&self, query: &StoryQuery) -> StoreResult<Page<Story>>;

    async fn get_story(&self, id: i64) -> StoreResult<Option<Story>>;

    async fn create_story(&self, input: &StoryInput) -> StoreResult<Story>;

    async fn update_story(&self, id: i64, input: &StoryInput) -> StoreResult<Option<Story>>;

    /// Removes the story with its chapters, comments, favorites and history.
    async fn delete_story(&self, id: i64) -> StoreResult<bool>;

    // -- Chapters --

    /// Chapters of a story ordered by number.
    async fn list_chapters(&self, story_id: i64) -> StoreResult<Vec<Chapter>>;

    async fn get_chapter(&self, id: i64) -> StoreResult<Option<Chapter>>;

    /// Fails with `NotFound` for an unknown story and `Conflict` when the
    /// number is already used in that story. Refreshes the story's `updated_at`.
    async fn create_chapter(&self, story_id: i64, input: &ChapterInput) -> StoreResult<Chapter>;

    async fn update_chapter(&self, id: i64, input: &ChapterInput)
        -> StoreResult<Option<Chapter>>;

    async fn delete_chapter(&self, id: i64) -> StoreResult<bool>;

    // -- Comments --

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>>;

    /// Every comment on a story (chapter comments included), newest first.
    async fn list_story_comments(&self, story_id: i64) -> StoreResult<Vec<CommentView>>;

    /// Comments on one chapter, newest first.
    async fn list_chapter_comments(&self, chapter_id: i64) -> StoreResult<Vec<CommentView>>;

    /// Removes the comment and its direct replies.
    async fn delete_comment(&self, id: i64) -> StoreResult<bool>;

    // -- Favorites --

    /// Fails with `Conflict` when the pair is already a favorite.
    async fn add_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<Favorite>;

    /// Returns whether a row was removed; a missing pair is not an error.
    async fn remove_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<bool>;

    async fn is_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<bool>;

    /// Newest favorite first.
    async fn list_favorites(&self, user_id: i64) -> StoreResult<Vec<FavoriteEntry>>;

    // -- Reading history --

    /// Point the (user, story) progress record at `chapter_id`, creating it
    /// on first read. At most one record exists per pair afterwards.
    async fn record_progress(
        &self,
        user_id: i64,
        story_id: i64,
        chapter_id: i64,
    ) -> StoreResult<ReadingProgress>;

    async fn get_progress(&self, user_id: i64, story_id: i64)
        -> StoreResult<Option<ReadingProgress>>;

    async fn remove_progress(&self, user_id: i64, story_id: i64) -> StoreResult<bool>;

    /// Returns the number of records removed.
    async fn clear_progress(&self, user_id: i64) -> StoreResult<u64>;

    /// Most recently read first.
    async fn list_progress(&self, user_id: i64) -> StoreResult<Vec<HistoryEntry>>;
}
