use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub is_admin: bool,
}

// --- Library ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryKind {
    Novel,
    Comic,
}

impl StoryKind {
    pub const ALL: [StoryKind; 2] = [StoryKind::Novel, StoryKind::Comic];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryKind::Novel => "novel",
            StoryKind::Comic => "comic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    #[default]
    Ongoing,
    Completed,
    Hiatus,
}

impl StoryStatus {
    pub const ALL: [StoryStatus; 3] = [
        StoryStatus::Ongoing,
        StoryStatus::Completed,
        StoryStatus::Hiatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryStatus::Ongoing => "ongoing",
            StoryStatus::Completed => "completed",
            StoryStatus::Hiatus => "hiatus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Story {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_url: Option<String>,
    pub kind: StoryKind,
    pub status: StoryStatus,
    pub genres: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoryInput {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    pub kind: StoryKind,
    #[serde(default)]
    pub status: StoryStatus,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Filters for the story listing. `page` is 1-based.
#[derive(Debug, Clone)]
pub struct StoryQuery {
    pub search: Option<String>,
    pub kind: Option<StoryKind>,
    pub status: Option<StoryStatus>,
    pub genre: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for StoryQuery {
    fn default() -> Self {
        Self {
            search: None,
            kind: None,
            status: None,
            genre: None,
            page: 1,
            per_page: 20,
        }
    }
}

impl StoryQuery {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Case-insensitive match on title or author, plus the exact filters.
    pub fn matches(&self, story: &Story) -> bool {
        if let Some(ref term) = self.search {
            let term = fold_case(term);
            if !fold_case(&story.title).contains(&term) && !fold_case(&story.author).contains(&term)
            {
                return false;
            }
        }
        if self.kind.is_some_and(|k| k != story.kind) {
            return false;
        }
        if self.status.is_some_and(|s| s != story.status) {
            return false;
        }
        if let Some(ref genre) = self.genre {
            if !story.genres.iter().any(|g| g == genre) {
                return false;
            }
        }
        true
    }
}

/// Unicode lower-casing used for story search in every backend.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

/// What a chapter holds, keyed on the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChapterContent {
    Novel { body: String },
    Oneshot { body: String },
    Comic { pages: Vec<String> },
}

impl ChapterContent {
    pub fn content_type(&self) -> &'static str {
        match self {
            ChapterContent::Novel { .. } => "novel",
            ChapterContent::Oneshot { .. } => "oneshot",
            ChapterContent::Comic { .. } => "comic",
        }
    }

    /// Comic stories carry page images, novels carry prose.
    pub fn fits(&self, kind: StoryKind) -> bool {
        match self {
            ChapterContent::Novel { .. } | ChapterContent::Oneshot { .. } => {
                kind == StoryKind::Novel
            }
            ChapterContent::Comic { .. } => kind == StoryKind::Comic,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Chapter {
    pub id: i64,
    pub story_id: i64,
    pub number: i64,
    pub title: String,
    pub content: ChapterContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChapterInput {
    pub number: i64,
    pub title: String,
    pub content: ChapterContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChapterSummary {
    pub id: i64,
    pub story_id: i64,
    pub number: i64,
    pub title: String,
    pub content_type: &'static str,
    pub created_at: DateTime<Utc>,
}

impl From<&Chapter> for ChapterSummary {
    fn from(chapter: &Chapter) -> Self {
        Self {
            id: chapter.id,
            story_id: chapter.story_id,
            number: chapter.number,
            title: chapter.title.clone(),
            content_type: chapter.content.content_type(),
            created_at: chapter.created_at,
        }
    }
}

// --- Comments ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub story_id: i64,
    pub chapter_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub user_id: i64,
    pub story_id: i64,
    pub chapter_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentAuthor {
    pub id: i64,
    pub username: String,
}

/// A comment row joined with the minimum author info the reader UI shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: CommentAuthor,
}

// --- Tracking ---

#[derive(Debug, Clone, Serialize)]
pub struct Favorite {
    pub id: i64,
    pub user_id: i64,
    pub story_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteEntry {
    pub story: Story,
    pub favorite: Favorite,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadingProgress {
    pub id: i64,
    pub user_id: i64,
    pub story_id: i64,
    pub chapter_id: i64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub story: Story,
    pub chapter: ChapterSummary,
    pub history: ReadingProgress,
}
