use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::db::models::*;
use crate::store::{Store, StoreError, StoreResult};

/// In-process store with the same observable behaviour as `SqliteStore`.
/// Each instance owns its tables; nothing is shared between instances.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    next_id: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    sessions: HashMap<String, (i64, DateTime<Utc>)>,
    stories: BTreeMap<i64, Story>,
    chapters: BTreeMap<i64, Chapter>,
    comments: BTreeMap<i64, Comment>,
    favorites: BTreeMap<i64, Favorite>,
    progress: BTreeMap<i64, ReadingProgress>,
}

/// Foreign-key check: `NotFound` when the referenced row is missing.
fn require(found: bool, table: &str, id: i64) -> StoreResult<()> {
    if found {
        Ok(())
    } else {
        Err(StoreError::NotFound(format!("{} {}", table, id)))
    }
}

impl Tables {
    fn allocate(&mut self, table: &'static str) -> i64 {
        let counter = self.next_id.entry(table).or_insert(0);
        *counter += 1;
        *counter
    }

    fn chapter_taken(&self, story_id: i64, number: i64, except: Option<i64>) -> bool {
        self.chapters
            .values()
            .any(|c| c.story_id == story_id && c.number == number && Some(c.id) != except)
    }

    fn comment_views<F>(&self, filter: F) -> Vec<CommentView>
    where
        F: Fn(&Comment) -> bool,
    {
        let mut views: Vec<CommentView> = self
            .comments
            .values()
            .filter(|c| filter(*c))
            .filter_map(|c| {
                let user = self.users.get(&c.user_id)?;
                Some(CommentView {
                    comment: c.clone(),
                    user: CommentAuthor {
                        id: user.id,
                        username: user.username.clone(),
                    },
                })
            })
            .collect();
        views.sort_by(|a, b| {
            b.comment
                .created_at
                .cmp(&a.comment.created_at)
                .then(b.comment.id.cmp(&a.comment.id))
        });
        views
    }

    /// Mirror of the ON DELETE CASCADE rules for a removed chapter.
    fn cascade_chapter(&mut self, chapter_id: i64) {
        self.comments.retain(|_, c| c.chapter_id != Some(chapter_id));
        self.progress.retain(|_, p| p.chapter_id != chapter_id);
        self.drop_orphaned_replies();
    }

    fn drop_orphaned_replies(&mut self) {
        let ids: Vec<i64> = self.comments.keys().copied().collect();
        self.comments
            .retain(|_, c| c.parent_id.map_or(true, |p| ids.contains(&p)));
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username already taken".into()));
        }

        let id = t.allocate("users");
        let created = User {
            id,
            username: user.username,
            password_hash: user.password_hash,
            is_admin: user.is_admin || t.users.is_empty(),
            created_at: Utc::now(),
        };
        t.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_count(&self) -> StoreResult<u64> {
        let t = self.tables.lock().await;
        Ok(t.users.len() as u64)
    }

    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut t = self.tables.lock().await;
        require(t.users.contains_key(&user_id), "user", user_id)?;
        t.sessions.insert(token.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .and_then(|(user_id, _)| t.users.get(user_id))
            .cloned())
    }

    async fn delete_session(&self, token: &str) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        Ok(t.sessions.remove(token).is_some())
    }

    async fn list_stories(&self, query: &StoryQuery) -> StoreResult<Page<Story>> {
        let t = self.tables.lock().await;
        let mut matching: Vec<&Story> = t.stories.values().filter(|s| query.matches(s)).collect();
        matching.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .cloned()
            .collect();

        Ok(Page {
            items,
            page: query.page,
            per_page: query.per_page,
            total,
        })
    }

    async fn get_story(&self, id: i64) -> StoreResult<Option<Story>> {
        let t = self.tables.lock().await;
        Ok(t.stories.get(&id).cloned())
    }

    async fn create_story(&self, input: &StoryInput) -> StoreResult<Story> {
        let mut t = self.tables.lock().await;
        let id = t.allocate("stories");
        let now = Utc::now();
        let story = Story {
            id,
            title: input.title.clone(),
            author: input.author.clone(),
            description: input.description.clone(),
            cover_url: input.cover_url.clone(),
            kind: input.kind,
            status: input.status,
            genres: input.genres.clone(),
            created_at: now,
            updated_at: now,
        };
        t.stories.insert(id, story.clone());
        Ok(story)
    }

    async fn update_story(&self, id: i64, input: &StoryInput) -> StoreResult<Option<Story>> {
        let mut t = self.tables.lock().await;
        let Some(story) = t.stories.get_mut(&id) else {
            return Ok(None);
        };
        story.title = input.title.clone();
        story.author = input.author.clone();
        story.description = input.description.clone();
        story.cover_url = input.cover_url.clone();
        story.kind = input.kind;
        story.status = input.status;
        story.genres = input.genres.clone();
        story.updated_at = Utc::now();
        Ok(Some(story.clone()))
    }

    async fn delete_story(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if t.stories.remove(&id).is_none() {
            return Ok(false);
        }
        t.chapters.retain(|_, c| c.story_id != id);
        t.comments.retain(|_, c| c.story_id != id);
        t.favorites.retain(|_, f| f.story_id != id);
        t.progress.retain(|_, p| p.story_id != id);
        Ok(true)
    }

    async fn list_chapters(&self, story_id: i64) -> StoreResult<Vec<Chapter>> {
        let t = self.tables.lock().await;
        let mut chapters: Vec<Chapter> = t
            .chapters
            .values()
            .filter(|c| c.story_id == story_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }

    async fn get_chapter(&self, id: i64) -> StoreResult<Option<Chapter>> {
        let t = self.tables.lock().await;
        Ok(t.chapters.get(&id).cloned())
    }

    async fn create_chapter(&self, story_id: i64, input: &ChapterInput) -> StoreResult<Chapter> {
        let mut t = self.tables.lock().await;
        if !t.stories.contains_key(&story_id) {
            return Err(StoreError::NotFound(format!("story {}", story_id)));
        }
        if t.chapter_taken(story_id, input.number, None) {
            return Err(StoreError::Conflict("chapter number already used".into()));
        }

        let id = t.allocate("chapters");
        let now = Utc::now();
        let chapter = Chapter {
            id,
            story_id,
            number: input.number,
            title: input.title.clone(),
            content: input.content.clone(),
            created_at: now,
            updated_at: now,
        };
        t.chapters.insert(id, chapter.clone());
        if let Some(story) = t.stories.get_mut(&story_id) {
            story.updated_at = now;
        }
        Ok(chapter)
    }

    async fn update_chapter(
        &self,
        id: i64,
        input: &ChapterInput,
    ) -> StoreResult<Option<Chapter>> {
        let mut t = self.tables.lock().await;
        let Some(story_id) = t.chapters.get(&id).map(|c| c.story_id) else {
            return Ok(None);
        };
        if t.chapter_taken(story_id, input.number, Some(id)) {
            return Err(StoreError::Conflict("chapter number already used".into()));
        }

        let Some(chapter) = t.chapters.get_mut(&id) else {
            return Ok(None);
        };
        chapter.number = input.number;
        chapter.title = input.title.clone();
        chapter.content = input.content.clone();
        chapter.updated_at = Utc::now();
        Ok(Some(chapter.clone()))
    }

    async fn delete_chapter(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        if t.chapters.remove(&id).is_none() {
            return Ok(false);
        }
        t.cascade_chapter(id);
        Ok(true)
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut t = self.tables.lock().await;
        require(t.users.contains_key(&comment.user_id), "user", comment.user_id)?;
        require(t.stories.contains_key(&comment.story_id), "story", comment.story_id)?;
        if let Some(chapter_id) = comment.chapter_id {
            require(t.chapters.contains_key(&chapter_id), "chapter", chapter_id)?;
        }
        if let Some(parent_id) = comment.parent_id {
            require(t.comments.contains_key(&parent_id), "comment", parent_id)?;
        }

        let id = t.allocate("comments");
        let created = Comment {
            id,
            user_id: comment.user_id,
            story_id: comment.story_id,
            chapter_id: comment.chapter_id,
            parent_id: comment.parent_id,
            content: comment.content,
            created_at: Utc::now(),
        };
        t.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let t = self.tables.lock().await;
        Ok(t.comments.get(&id).cloned())
    }

    async fn list_story_comments(&self, story_id: i64) -> StoreResult<Vec<CommentView>> {
        let t = self.tables.lock().await;
        Ok(t.comment_views(|c| c.story_id == story_id))
    }

    async fn list_chapter_comments(&self, chapter_id: i64) -> StoreResult<Vec<CommentView>> {
        let t = self.tables.lock().await;
        Ok(t.comment_views(|c| c.chapter_id == Some(chapter_id)))
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.comments.len();
        t.comments
            .retain(|_, c| c.id != id && c.parent_id != Some(id));
        Ok(t.comments.len() < before)
    }

    async fn add_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<Favorite> {
        let mut t = self.tables.lock().await;
        require(t.users.contains_key(&user_id), "user", user_id)?;
        require(t.stories.contains_key(&story_id), "story", story_id)?;
        if t
            .favorites
            .values()
            .any(|f| f.user_id == user_id && f.story_id == story_id)
        {
            return Err(StoreError::Conflict("story already in favorites".into()));
        }

        let id = t.allocate("favorites");
        let favorite = Favorite {
            id,
            user_id,
            story_id,
            created_at: Utc::now(),
        };
        t.favorites.insert(id, favorite.clone());
        Ok(favorite)
    }

    async fn remove_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.favorites.len();
        t.favorites
            .retain(|_, f| !(f.user_id == user_id && f.story_id == story_id));
        Ok(t.favorites.len() < before)
    }

    async fn is_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<bool> {
        let t = self.tables.lock().await;
        Ok(t
            .favorites
            .values()
            .any(|f| f.user_id == user_id && f.story_id == story_id))
    }

    async fn list_favorites(&self, user_id: i64) -> StoreResult<Vec<FavoriteEntry>> {
        let t = self.tables.lock().await;
        let mut entries: Vec<FavoriteEntry> = t
            .favorites
            .values()
            .filter(|f| f.user_id == user_id)
            .filter_map(|f| {
                Some(FavoriteEntry {
                    story: t.stories.get(&f.story_id)?.clone(),
                    favorite: f.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.favorite
                .created_at
                .cmp(&a.favorite.created_at)
                .then(b.favorite.id.cmp(&a.favorite.id))
        });
        Ok(entries)
    }

    async fn record_progress(
        &self,
        user_id: i64,
        story_id: i64,
        chapter_id: i64,
    ) -> StoreResult<ReadingProgress> {
        let mut t = self.tables.lock().await;
        require(t.users.contains_key(&user_id), "user", user_id)?;
        require(t.stories.contains_key(&story_id), "story", story_id)?;
        require(t.chapters.contains_key(&chapter_id), "chapter", chapter_id)?;

        let now = Utc::now();
        if let Some(existing) = t
            .progress
            .values_mut()
            .find(|p| p.user_id == user_id && p.story_id == story_id)
        {
            existing.chapter_id = chapter_id;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let id = t.allocate("reading_history");
        let record = ReadingProgress {
            id,
            user_id,
            story_id,
            chapter_id,
            updated_at: now,
        };
        t.progress.insert(id, record.clone());
        Ok(record)
    }

    async fn get_progress(
        &self,
        user_id: i64,
        story_id: i64,
    ) -> StoreResult<Option<ReadingProgress>> {
        let t = self.tables.lock().await;
        Ok(t
            .progress
            .values()
            .find(|p| p.user_id == user_id && p.story_id == story_id)
            .cloned())
    }

    async fn remove_progress(&self, user_id: i64, story_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.progress.len();
        t.progress
            .retain(|_, p| !(p.user_id == user_id && p.story_id == story_id));
        Ok(t.progress.len() < before)
    }

    async fn clear_progress(&self, user_id: i64) -> StoreResult<u64> {
        let mut t = self.tables.lock().await;
        let before = t.progress.len();
        t.progress.retain(|_, p| p.user_id != user_id);
        Ok((before - t.progress.len()) as u64)
    }

    async fn list_progress(&self, user_id: i64) -> StoreResult<Vec<HistoryEntry>> {
        let t = self.tables.lock().await;
        let mut entries: Vec<HistoryEntry> = t
            .progress
            .values()
            .filter(|p| p.user_id == user_id)
            .filter_map(|p| {
                Some(HistoryEntry {
                    story: t.stories.get(&p.story_id)?.clone(),
                    chapter: ChapterSummary::from(t.chapters.get(&p.chapter_id)?),
                    history: p.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.history
                .updated_at
                .cmp(&a.history.updated_at)
                .then(b.history.id.cmp(&a.history.id))
        });
        Ok(entries)
    }
}
