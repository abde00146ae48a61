use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};

use crate::db::models::*;
use crate::state::DbPool;
use crate::store::{Store, StoreError, StoreResult};

/// SQLite implementation
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// --- Column mapping ---

impl ToSql for StoryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for StoryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        StoryKind::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown story kind '{}'", s).into()))
    }
}

impl ToSql for StoryStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for StoryStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        StoryStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown story status '{}'", s).into()))
    }
}

const USER_COLUMNS: &str = "u.id, u.username, u.password_hash, u.is_admin, u.created_at";

const STORY_COLUMNS: &str = "s.id, s.title, s.author, s.description, s.cover_url, s.kind, \
                             s.status, s.genres, s.created_at, s.updated_at";
const STORY_WIDTH: usize = 10;

const CHAPTER_COLUMNS: &str = "c.id, c.story_id, c.number, c.title, c.content_type, c.body, \
                               c.pages, c.created_at, c.updated_at";
const CHAPTER_WIDTH: usize = 9;

const COMMENT_COLUMNS: &str =
    "m.id, m.user_id, m.story_id, m.chapter_id, m.parent_id, m.content, m.created_at";

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        is_admin: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn story_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Story> {
    Ok(Story {
        id: row.get(at)?,
        title: row.get(at + 1)?,
        author: row.get(at + 2)?,
        description: row.get(at + 3)?,
        cover_url: row.get(at + 4)?,
        kind: row.get(at + 5)?,
        status: row.get(at + 6)?,
        genres: json_column(row, at + 7)?,
        created_at: row.get(at + 8)?,
        updated_at: row.get(at + 9)?,
    })
}

fn chapter_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Chapter> {
    let content_type: String = row.get(at + 4)?;
    let body: Option<String> = row.get(at + 5)?;
    let content = match content_type.as_str() {
        "novel" => ChapterContent::Novel {
            body: body.unwrap_or_default(),
        },
        "oneshot" => ChapterContent::Oneshot {
            body: body.unwrap_or_default(),
        },
        "comic" => {
            let pages: Option<String> = row.get(at + 6)?;
            let pages = match pages {
                Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(at + 6, Type::Text, Box::new(e))
                })?,
                None => Vec::new(),
            };
            ChapterContent::Comic { pages }
        }
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                at + 4,
                Type::Text,
                format!("unknown content type '{}'", other).into(),
            ))
        }
    };

    Ok(Chapter {
        id: row.get(at)?,
        story_id: row.get(at + 1)?,
        number: row.get(at + 2)?,
        title: row.get(at + 3)?,
        content,
        created_at: row.get(at + 7)?,
        updated_at: row.get(at + 8)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        story_id: row.get(2)?,
        chapter_id: row.get(3)?,
        parent_id: row.get(4)?,
        content: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn favorite_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Favorite> {
    Ok(Favorite {
        id: row.get(at)?,
        user_id: row.get(at + 1)?,
        story_id: row.get(at + 2)?,
        created_at: row.get(at + 3)?,
    })
}

fn progress_from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<ReadingProgress> {
    Ok(ReadingProgress {
        id: row.get(at)?,
        user_id: row.get(at + 1)?,
        story_id: row.get(at + 2)?,
        chapter_id: row.get(at + 3)?,
        updated_at: row.get(at + 4)?,
    })
}

/// Columns stored for a chapter body: (content_type, body, pages JSON).
fn content_columns(content: &ChapterContent) -> StoreResult<(&'static str, Option<&str>, Option<String>)> {
    Ok(match content {
        ChapterContent::Novel { body } | ChapterContent::Oneshot { body } => {
            (content.content_type(), Some(body.as_str()), None)
        }
        ChapterContent::Comic { pages } => {
            (content.content_type(), None, Some(serde_json::to_string(pages)?))
        }
    })
}

/// UNIQUE and PRIMARY KEY violations become `Conflict`, a dangling foreign
/// key becomes `NotFound`. CHECK and NOT NULL failures stay `Sql`.
fn map_constraint(err: rusqlite::Error, conflict: &str) -> StoreError {
    let extended = match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    };
    match extended {
        Some(ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => {
            StoreError::Conflict(conflict.to_string())
        }
        Some(ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
            StoreError::NotFound("referenced record".to_string())
        }
        _ => StoreError::Sql(err),
    }
}

// --- Single-row lookups shared by several operations ---

fn query_story(conn: &Connection, id: i64) -> StoreResult<Option<Story>> {
    let sql = format!("SELECT {} FROM stories s WHERE s.id = ?1", STORY_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], |row| story_from_row(row, 0))
        .optional()?)
}

fn query_chapter(conn: &Connection, id: i64) -> StoreResult<Option<Chapter>> {
    let sql = format!("SELECT {} FROM chapters c WHERE c.id = ?1", CHAPTER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], |row| chapter_from_row(row, 0))
        .optional()?)
}

fn query_comment(conn: &Connection, id: i64) -> StoreResult<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments m WHERE m.id = ?1", COMMENT_COLUMNS);
    Ok(conn.query_row(&sql, params![id], comment_from_row).optional()?)
}

fn query_progress(conn: &Connection, user_id: i64, story_id: i64) -> StoreResult<Option<ReadingProgress>> {
    Ok(conn
        .query_row(
            "SELECT h.id, h.user_id, h.story_id, h.chapter_id, h.updated_at
             FROM reading_history h
             WHERE h.user_id = ?1 AND h.story_id = ?2",
            params![user_id, story_id],
            |row| progress_from_row(row, 0),
        )
        .optional()?)
}

fn query_comment_views(conn: &Connection, filter: &str, id: i64) -> StoreResult<Vec<CommentView>> {
    let sql = format!(
        "SELECT {}, u.username
         FROM comments m
         JOIN users u ON u.id = m.user_id
         WHERE {} = ?1
         ORDER BY m.created_at DESC, m.id DESC",
        COMMENT_COLUMNS, filter
    );
    let mut stmt = conn.prepare(&sql)?;
    let views = stmt
        .query_map(params![id], |row| {
            let comment = comment_from_row(row)?;
            let user = CommentAuthor {
                id: comment.user_id,
                username: row.get(7)?,
            };
            Ok(CommentView { comment, user })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(views)
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let conn = self.pool.get()?;
        // The admin check runs inside the INSERT's write transaction.
        conn.execute(
            "INSERT INTO users (username, password_hash, is_admin, created_at)
             SELECT ?1, ?2, ?3 OR NOT EXISTS (SELECT 1 FROM users), ?4",
            params![user.username, user.password_hash, user.is_admin, Utc::now()],
        )
        .map_err(|e| map_constraint(e, "username already taken"))?;

        let id = conn.last_insert_rowid();
        let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS);
        Ok(conn.query_row(&sql, params![id], user_from_row)?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        let sql = format!("SELECT {} FROM users u WHERE u.username = ?1", USER_COLUMNS);
        Ok(conn.query_row(&sql, params![username], user_from_row).optional()?)
    }

    async fn user_count(&self) -> StoreResult<u64> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO sessions (id, user_id, token, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, user_id, token, expires_at, Utc::now()],
        )
        .map_err(|e| map_constraint(e, "session token already issued"))?;
        Ok(())
    }

    async fn find_session_user(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.expires_at > ?2",
            USER_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![token, now], user_from_row)
            .optional()?)
    }

    async fn delete_session(&self, token: &str) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(rows > 0)
    }

    async fn list_stories(&self, query: &StoryQuery) -> StoreResult<Page<Story>> {
        let conn = self.pool.get()?;

        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        // Both sides folded in Rust; SQLite's own LIKE only folds ASCII.
        if let Some(ref term) = query.search {
            let term = fold_case(term);
            clauses.push("(instr(s.title_folded, ?) > 0 OR instr(s.author_folded, ?) > 0)");
            args.push(Box::new(term.clone()));
            args.push(Box::new(term));
        }
        if let Some(kind) = query.kind {
            clauses.push("s.kind = ?");
            args.push(Box::new(kind));
        }
        if let Some(status) = query.status {
            clauses.push("s.status = ?");
            args.push(Box::new(status));
        }
        if let Some(ref genre) = query.genre {
            clauses.push("EXISTS (SELECT 1 FROM json_each(s.genres) WHERE json_each.value = ?)");
            args.push(Box::new(genre.clone()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM stories s {}", where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        args.push(Box::new(i64::from(query.per_page)));
        args.push(Box::new(query.offset() as i64));

        let sql = format!(
            "SELECT {} FROM stories s {}
             ORDER BY s.updated_at DESC, s.id DESC
             LIMIT ? OFFSET ?",
            STORY_COLUMNS, where_sql
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(args.iter()), |row| story_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            page: query.page,
            per_page: query.per_page,
            total: total as u64,
        })
    }

    async fn get_story(&self, id: i64) -> StoreResult<Option<Story>> {
        let conn = self.pool.get()?;
        query_story(&conn, id)
    }

    async fn create_story(&self, input: &StoryInput) -> StoreResult<Story> {
        let conn = self.pool.get()?;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO stories (title, author, description, cover_url, kind, status, genres,
                                  title_folded, author_folded, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                input.title,
                input.author,
                input.description,
                input.cover_url,
                input.kind,
                input.status,
                serde_json::to_string(&input.genres)?,
                fold_case(&input.title),
                fold_case(&input.author),
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        query_story(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("story {}", id)))
    }

    async fn update_story(&self, id: i64, input: &StoryInput) -> StoreResult<Option<Story>> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE stories SET title = ?1, author = ?2, description = ?3, cover_url = ?4,
                    kind = ?5, status = ?6, genres = ?7, title_folded = ?8, author_folded = ?9,
                    updated_at = ?10
             WHERE id = ?11",
            params![
                input.title,
                input.author,
                input.description,
                input.cover_url,
                input.kind,
                input.status,
                serde_json::to_string(&input.genres)?,
                fold_case(&input.title),
                fold_case(&input.author),
                Utc::now(),
                id,
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        query_story(&conn, id)
    }

    async fn delete_story(&self, id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM stories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn list_chapters(&self, story_id: i64) -> StoreResult<Vec<Chapter>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {} FROM chapters c WHERE c.story_id = ?1 ORDER BY c.number ASC",
            CHAPTER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let chapters = stmt
            .query_map(params![story_id], |row| chapter_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(chapters)
    }

    async fn get_chapter(&self, id: i64) -> StoreResult<Option<Chapter>> {
        let conn = self.pool.get()?;
        query_chapter(&conn, id)
    }

    async fn create_chapter(&self, story_id: i64, input: &ChapterInput) -> StoreResult<Chapter> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        if query_story(&tx, story_id)?.is_none() {
            return Err(StoreError::NotFound(format!("story {}", story_id)));
        }

        let (content_type, body, pages) = content_columns(&input.content)?;
        let now = Utc::now();
        tx.execute(
            "INSERT INTO chapters (story_id, number, title, content_type, body, pages, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![story_id, input.number, input.title, content_type, body, pages, now],
        )
        .map_err(|e| map_constraint(e, "chapter number already used"))?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "UPDATE stories SET updated_at = ?1 WHERE id = ?2",
            params![now, story_id],
        )?;

        let chapter =
            query_chapter(&tx, id)?.ok_or_else(|| StoreError::NotFound(format!("chapter {}", id)))?;
        tx.commit()?;
        Ok(chapter)
    }

    async fn update_chapter(
        &self,
        id: i64,
        input: &ChapterInput,
    ) -> StoreResult<Option<Chapter>> {
        let conn = self.pool.get()?;
        let (content_type, body, pages) = content_columns(&input.content)?;
        let rows = conn
            .execute(
                "UPDATE chapters SET number = ?1, title = ?2, content_type = ?3, body = ?4,
                        pages = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![input.number, input.title, content_type, body, pages, Utc::now(), id],
            )
            .map_err(|e| map_constraint(e, "chapter number already used"))?;

        if rows == 0 {
            return Ok(None);
        }
        query_chapter(&conn, id)
    }

    async fn delete_chapter(&self, id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM chapters WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO comments (user_id, story_id, chapter_id, parent_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                comment.user_id,
                comment.story_id,
                comment.chapter_id,
                comment.parent_id,
                comment.content,
                Utc::now(),
            ],
        )
        .map_err(|e| map_constraint(e, "comment already exists"))?;

        let id = conn.last_insert_rowid();
        query_comment(&conn, id)?.ok_or_else(|| StoreError::NotFound(format!("comment {}", id)))
    }

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let conn = self.pool.get()?;
        query_comment(&conn, id)
    }

    async fn list_story_comments(&self, story_id: i64) -> StoreResult<Vec<CommentView>> {
        let conn = self.pool.get()?;
        query_comment_views(&conn, "m.story_id", story_id)
    }

    async fn list_chapter_comments(&self, chapter_id: i64) -> StoreResult<Vec<CommentView>> {
        let conn = self.pool.get()?;
        query_comment_views(&conn, "m.chapter_id", chapter_id)
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM comments WHERE id = ?1 OR parent_id = ?1",
            params![id],
        )?;
        Ok(rows > 0)
    }

    async fn add_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<Favorite> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO favorites (user_id, story_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, story_id, Utc::now()],
        )
        .map_err(|e| map_constraint(e, "story already in favorites"))?;

        let id = conn.last_insert_rowid();
        Ok(conn.query_row(
            "SELECT f.id, f.user_id, f.story_id, f.created_at FROM favorites f WHERE f.id = ?1",
            params![id],
            |row| favorite_from_row(row, 0),
        )?)
    }

    async fn remove_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM favorites WHERE user_id = ?1 AND story_id = ?2",
            params![user_id, story_id],
        )?;
        Ok(rows > 0)
    }

    async fn is_favorite(&self, user_id: i64, story_id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let found: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM favorites WHERE user_id = ?1 AND story_id = ?2",
            params![user_id, story_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    async fn list_favorites(&self, user_id: i64) -> StoreResult<Vec<FavoriteEntry>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {}, f.id, f.user_id, f.story_id, f.created_at
             FROM favorites f
             JOIN stories s ON s.id = f.story_id
             WHERE f.user_id = ?1
             ORDER BY f.created_at DESC, f.id DESC",
            STORY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![user_id], |row| {
                Ok(FavoriteEntry {
                    story: story_from_row(row, 0)?,
                    favorite: favorite_from_row(row, STORY_WIDTH)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    async fn record_progress(
        &self,
        user_id: i64,
        story_id: i64,
        chapter_id: i64,
    ) -> StoreResult<ReadingProgress> {
        let conn = self.pool.get()?;
        // The UNIQUE(user_id, story_id) index makes this a single atomic upsert.
        conn.execute(
            "INSERT INTO reading_history (user_id, story_id, chapter_id, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, story_id) DO UPDATE SET
               chapter_id = excluded.chapter_id,
               updated_at = excluded.updated_at",
            params![user_id, story_id, chapter_id, Utc::now()],
        )
        .map_err(|e| map_constraint(e, "reading progress already recorded"))?;

        query_progress(&conn, user_id, story_id)?.ok_or_else(|| {
            StoreError::NotFound(format!("progress for user {} story {}", user_id, story_id))
        })
    }

    async fn get_progress(
        &self,
        user_id: i64,
        story_id: i64,
    ) -> StoreResult<Option<ReadingProgress>> {
        let conn = self.pool.get()?;
        query_progress(&conn, user_id, story_id)
    }

    async fn remove_progress(&self, user_id: i64, story_id: i64) -> StoreResult<bool> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM reading_history WHERE user_id = ?1 AND story_id = ?2",
            params![user_id, story_id],
        )?;
        Ok(rows > 0)
    }

    async fn clear_progress(&self, user_id: i64) -> StoreResult<u64> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM reading_history WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(rows as u64)
    }

    async fn list_progress(&self, user_id: i64) -> StoreResult<Vec<HistoryEntry>> {
        let conn = self.pool.get()?;
        let sql = format!(
            "SELECT {}, {}, h.id, h.user_id, h.story_id, h.chapter_id, h.updated_at
             FROM reading_history h
             JOIN stories s ON s.id = h.story_id
             JOIN chapters c ON c.id = h.chapter_id
             WHERE h.user_id = ?1
             ORDER BY h.updated_at DESC, h.id DESC",
            STORY_COLUMNS, CHAPTER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![user_id], |row| {
                let chapter = chapter_from_row(row, STORY_WIDTH)?;
                Ok(HistoryEntry {
                    story: story_from_row(row, 0)?,
                    chapter: ChapterSummary::from(&chapter),
                    history: progress_from_row(row, STORY_WIDTH + CHAPTER_WIDTH)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
