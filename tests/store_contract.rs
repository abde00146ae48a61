//! Behaviour every `Store` backend must share. Each check runs against the
//! in-memory store and a SQLite database in a temporary directory.

use chrono::{Duration, Utc};
use folio::db;
use folio::db::models::{
    ChapterContent, ChapterInput, NewComment, NewUser, Page, Story, StoryInput, StoryKind,
    StoryQuery, StoryStatus,
};
use folio::store::{MemoryStore, SqliteStore, Store, StoreError};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::task::JoinSet;

fn sqlite_store() -> (TempDir, SqliteStore) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    (temp_dir, SqliteStore::new(pool))
}

macro_rules! contract {
    (
        borrowed: [$($name:ident),* $(,)?],
        shared: [$($shared:ident),* $(,)?] $(,)?
    ) => {
        mod memory {
            use std::sync::Arc;

            $(
                #[tokio::test]
                async fn $name() {
                    let store = super::MemoryStore::new();
                    super::$name(&store).await;
                }
            )*

            $(
                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn $shared() {
                    let store: Arc<dyn super::Store> = Arc::new(super::MemoryStore::new());
                    super::$shared(store).await;
                }
            )*
        }

        mod sqlite {
            use std::sync::Arc;

            $(
                #[tokio::test]
                async fn $name() {
                    let (_dir, store) = super::sqlite_store();
                    super::$name(&store).await;
                }
            )*

            $(
                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn $shared() {
                    let (_dir, store) = super::sqlite_store();
                    let store: Arc<dyn super::Store> = Arc::new(store);
                    super::$shared(store).await;
                }
            )*
        }
    };
}

contract!(
    borrowed: [
        record_progress_keeps_one_row_per_pair,
        reading_scenario_moves_to_next_chapter,
        history_remove_and_clear,
        remove_missing_history_is_false,
        duplicate_favorite_conflicts,
        add_then_remove_favorite_leaves_nothing,
        missing_referents_are_not_found,
        deleting_story_cascades,
        deleting_chapter_drops_its_progress,
        expired_sessions_are_ignored,
        duplicate_username_conflicts,
        first_user_becomes_admin,
        comments_are_newest_first,
        deleting_comment_removes_replies,
        chapter_numbers_are_unique_per_story,
        chapter_for_missing_story_is_not_found,
        story_listing_filters_and_pages,
        story_search_folds_non_ascii_case,
    ],
    shared: [
        concurrent_progress_converges_on_one_row,
        concurrent_signups_make_one_admin,
    ],
);

// --- Fixtures ---

async fn user(store: &dyn Store, name: &str) -> i64 {
    store
        .create_user(NewUser {
            username: name.into(),
            password_hash: "hash".into(),
            is_admin: false,
        })
        .await
        .unwrap()
        .id
}

fn story_input(title: &str, kind: StoryKind) -> StoryInput {
    StoryInput {
        title: title.into(),
        author: "Ana Reyes".into(),
        description: String::new(),
        cover_url: None,
        kind,
        status: StoryStatus::Ongoing,
        genres: vec!["fantasy".into()],
    }
}

fn assert_not_found<T: std::fmt::Debug>(result: Result<T, StoreError>) {
    match result {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

async fn story(store: &dyn Store, title: &str) -> i64 {
    store
        .create_story(&story_input(title, StoryKind::Novel))
        .await
        .unwrap()
        .id
}

async fn chapter(store: &dyn Store, story_id: i64, number: i64) -> i64 {
    store
        .create_chapter(
            story_id,
            &ChapterInput {
                number,
                title: format!("Chapter {}", number),
                content: ChapterContent::Novel {
                    body: "Once upon a time.".into(),
                },
            },
        )
        .await
        .unwrap()
        .id
}

async fn comment(
    store: &dyn Store,
    user_id: i64,
    story_id: i64,
    parent_id: Option<i64>,
    content: &str,
) -> i64 {
    store
        .create_comment(NewComment {
            user_id,
            story_id,
            chapter_id: None,
            parent_id,
            content: content.into(),
        })
        .await
        .unwrap()
        .id
}

// --- Reading history ---

async fn record_progress_keeps_one_row_per_pair(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    let mut chapters = Vec::new();
    for number in 1..=5 {
        chapters.push(chapter(store, story_id, number).await);
    }

    for &chapter_id in &chapters {
        store
            .record_progress(reader, story_id, chapter_id)
            .await
            .unwrap();
    }

    let history = store.list_progress(reader).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].history.chapter_id, chapters[4]);
    assert_eq!(history[0].chapter.number, 5);
}

async fn reading_scenario_moves_to_next_chapter(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    let first = chapter(store, story_id, 10).await;
    let second = chapter(store, story_id, 11).await;

    let progress = store.record_progress(reader, story_id, first).await.unwrap();
    assert_eq!(progress.chapter_id, first);

    let progress = store.record_progress(reader, story_id, second).await.unwrap();
    assert_eq!(progress.chapter_id, second);

    let stored = store.get_progress(reader, story_id).await.unwrap().unwrap();
    assert_eq!(stored.chapter_id, second);
    assert_eq!(store.list_progress(reader).await.unwrap().len(), 1);
}

async fn history_remove_and_clear(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let other = user(store, "other").await;
    let a = story(store, "A").await;
    let b = story(store, "B").await;
    let a1 = chapter(store, a, 1).await;
    let b1 = chapter(store, b, 1).await;

    store.record_progress(reader, a, a1).await.unwrap();
    store.record_progress(reader, b, b1).await.unwrap();
    store.record_progress(other, a, a1).await.unwrap();

    assert!(store.remove_progress(reader, a).await.unwrap());
    assert!(store.get_progress(reader, a).await.unwrap().is_none());

    assert_eq!(store.clear_progress(reader).await.unwrap(), 1);
    assert!(store.list_progress(reader).await.unwrap().is_empty());
    assert_eq!(store.list_progress(other).await.unwrap().len(), 1);
}

async fn remove_missing_history_is_false(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    assert!(!store.remove_progress(reader, story_id).await.unwrap());
    assert_eq!(store.clear_progress(reader).await.unwrap(), 0);
}

// --- Favorites ---

async fn duplicate_favorite_conflicts(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;

    store.add_favorite(reader, story_id).await.unwrap();
    let err = store.add_favorite(reader, story_id).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {:?}", err);

    assert_eq!(store.list_favorites(reader).await.unwrap().len(), 1);
}

async fn add_then_remove_favorite_leaves_nothing(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;

    store.add_favorite(reader, story_id).await.unwrap();
    assert!(store.is_favorite(reader, story_id).await.unwrap());

    assert!(store.remove_favorite(reader, story_id).await.unwrap());
    assert!(!store.is_favorite(reader, story_id).await.unwrap());
    assert!(store.list_favorites(reader).await.unwrap().is_empty());

    assert!(!store.remove_favorite(reader, story_id).await.unwrap());
}

async fn missing_referents_are_not_found(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    let chapter_id = chapter(store, story_id, 1).await;

    assert_not_found(store.add_favorite(reader, 9999).await);
    assert_not_found(store.add_favorite(9999, story_id).await);
    assert_not_found(store.record_progress(reader, story_id, 9999).await);
    assert_not_found(store.record_progress(9999, story_id, chapter_id).await);
    assert_not_found(
        store
            .create_session(9999, "orphan-token", Utc::now() + Duration::hours(1))
            .await,
    );

    for (user_id, chapter_id, parent_id) in [
        (9999, None, None),
        (reader, Some(9999), None),
        (reader, None, Some(9999)),
    ] {
        assert_not_found(
            store
                .create_comment(NewComment {
                    user_id,
                    story_id,
                    chapter_id,
                    parent_id,
                    content: "dangling".into(),
                })
                .await,
        );
    }

    assert!(store.list_favorites(reader).await.unwrap().is_empty());
    assert!(store.list_progress(reader).await.unwrap().is_empty());
    assert!(store.list_story_comments(story_id).await.unwrap().is_empty());
}

// --- Cascades ---

async fn deleting_story_cascades(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    let keep = story(store, "Keep").await;
    let chapter_id = chapter(store, story_id, 1).await;
    comment(store, reader, story_id, None, "Loved it").await;
    store.add_favorite(reader, story_id).await.unwrap();
    store.add_favorite(reader, keep).await.unwrap();
    store
        .record_progress(reader, story_id, chapter_id)
        .await
        .unwrap();

    assert!(store.delete_story(story_id).await.unwrap());

    assert!(store.get_story(story_id).await.unwrap().is_none());
    assert!(store.get_chapter(chapter_id).await.unwrap().is_none());
    assert!(store.list_story_comments(story_id).await.unwrap().is_empty());
    assert!(store.list_progress(reader).await.unwrap().is_empty());
    let favorites = store.list_favorites(reader).await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].story.id, keep);

    assert!(!store.delete_story(story_id).await.unwrap());
}

async fn deleting_chapter_drops_its_progress(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    let chapter_id = chapter(store, story_id, 1).await;
    store
        .record_progress(reader, story_id, chapter_id)
        .await
        .unwrap();

    assert!(store.delete_chapter(chapter_id).await.unwrap());
    assert!(store.get_progress(reader, story_id).await.unwrap().is_none());
    assert!(store.list_chapters(story_id).await.unwrap().is_empty());
}

// --- Users and sessions ---

async fn expired_sessions_are_ignored(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let now = Utc::now();

    store
        .create_session(reader, "live-token", now + Duration::hours(1))
        .await
        .unwrap();
    store
        .create_session(reader, "stale-token", now - Duration::hours(1))
        .await
        .unwrap();

    let found = store.find_session_user("live-token", now).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(reader));
    assert!(store
        .find_session_user("stale-token", now)
        .await
        .unwrap()
        .is_none());
    assert!(store.find_session_user("nope", now).await.unwrap().is_none());

    assert!(store.delete_session("live-token").await.unwrap());
    assert!(store
        .find_session_user("live-token", now)
        .await
        .unwrap()
        .is_none());
}

async fn duplicate_username_conflicts(store: &dyn Store) {
    user(store, "reader").await;
    let err = store
        .create_user(NewUser {
            username: "reader".into(),
            password_hash: "hash".into(),
            is_admin: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {:?}", err);
    assert_eq!(store.user_count().await.unwrap(), 1);
}

async fn first_user_becomes_admin(store: &dyn Store) {
    let first = store
        .create_user(NewUser {
            username: "editor".into(),
            password_hash: "hash".into(),
            is_admin: false,
        })
        .await
        .unwrap();
    assert!(first.is_admin);

    let second = store
        .create_user(NewUser {
            username: "reader".into(),
            password_hash: "hash".into(),
            is_admin: false,
        })
        .await
        .unwrap();
    assert!(!second.is_admin);
}

// --- Comments ---

async fn comments_are_newest_first(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    let first = comment(store, reader, story_id, None, "first").await;
    let second = comment(store, reader, story_id, None, "second").await;
    let third = comment(store, reader, story_id, Some(first), "reply").await;

    let listed: Vec<i64> = store
        .list_story_comments(story_id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.comment.id)
        .collect();
    assert_eq!(listed, vec![third, second, first]);

    let views = store.list_story_comments(story_id).await.unwrap();
    assert_eq!(views[0].user.username, "reader");
}

async fn deleting_comment_removes_replies(store: &dyn Store) {
    let reader = user(store, "reader").await;
    let story_id = story(store, "Tidewater").await;
    let parent = comment(store, reader, story_id, None, "parent").await;
    let reply = comment(store, reader, story_id, Some(parent), "reply").await;
    let other = comment(store, reader, story_id, None, "other").await;

    assert!(store.delete_comment(parent).await.unwrap());

    assert!(store.get_comment(reply).await.unwrap().is_none());
    let remaining: Vec<i64> = store
        .list_story_comments(story_id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.comment.id)
        .collect();
    assert_eq!(remaining, vec![other]);

    assert!(!store.delete_comment(parent).await.unwrap());
}

// --- Chapters and stories ---

async fn chapter_numbers_are_unique_per_story(store: &dyn Store) {
    let a = story(store, "A").await;
    let b = story(store, "B").await;
    chapter(store, a, 1).await;
    chapter(store, b, 1).await;

    let err = store
        .create_chapter(
            a,
            &ChapterInput {
                number: 1,
                title: "Again".into(),
                content: ChapterContent::Oneshot { body: "x".into() },
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {:?}", err);

    chapter(store, a, 2).await;
    let numbers: Vec<i64> = store
        .list_chapters(a)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.number)
        .collect();
    assert_eq!(numbers, vec![1, 2]);
}

async fn chapter_for_missing_story_is_not_found(store: &dyn Store) {
    let err = store
        .create_chapter(
            999,
            &ChapterInput {
                number: 1,
                title: "Lost".into(),
                content: ChapterContent::Novel { body: "x".into() },
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {:?}", err);
}

async fn story_listing_filters_and_pages(store: &dyn Store) {
    let fixtures = [
        ("Tidewater", StoryKind::Novel, StoryStatus::Ongoing, vec!["fantasy"]),
        ("Ink Lines", StoryKind::Comic, StoryStatus::Completed, vec!["comedy"]),
        ("Tidal Ink", StoryKind::Comic, StoryStatus::Ongoing, vec!["fantasy", "drama"]),
    ];
    for (title, kind, status, genres) in fixtures {
        store
            .create_story(&StoryInput {
                status,
                genres: genres.into_iter().map(String::from).collect(),
                ..story_input(title, kind)
            })
            .await
            .unwrap();
    }

    let comics = listed(
        store,
        StoryQuery {
            kind: Some(StoryKind::Comic),
            ..StoryQuery::default()
        },
    )
    .await;
    assert_eq!(comics.total, 2);
    assert!(comics.items.iter().all(|s| s.kind == StoryKind::Comic));

    let search = listed(
        store,
        StoryQuery {
            search: Some("TID".into()),
            ..StoryQuery::default()
        },
    )
    .await;
    assert_eq!(search.total, 2);

    let fantasy = listed(
        store,
        StoryQuery {
            genre: Some("fantasy".into()),
            ..StoryQuery::default()
        },
    )
    .await;
    let mut titles: Vec<String> = fantasy.items.into_iter().map(|s| s.title).collect();
    titles.sort();
    assert_eq!(titles, vec!["Tidal Ink", "Tidewater"]);

    let horror = listed(
        store,
        StoryQuery {
            genre: Some("horror".into()),
            ..StoryQuery::default()
        },
    )
    .await;
    assert_eq!(horror.total, 0);
    assert!(horror.items.is_empty());

    let completed = listed(
        store,
        StoryQuery {
            status: Some(StoryStatus::Completed),
            ..StoryQuery::default()
        },
    )
    .await;
    assert_eq!(completed.total, 1);
    assert_eq!(completed.items[0].title, "Ink Lines");

    let combined = listed(
        store,
        StoryQuery {
            kind: Some(StoryKind::Comic),
            status: Some(StoryStatus::Ongoing),
            genre: Some("drama".into()),
            ..StoryQuery::default()
        },
    )
    .await;
    assert_eq!(combined.total, 1);
    assert_eq!(combined.items[0].title, "Tidal Ink");

    let paged = listed(
        store,
        StoryQuery {
            page: 2,
            per_page: 2,
            ..StoryQuery::default()
        },
    )
    .await;
    assert_eq!(paged.total, 3);
    assert_eq!(paged.items.len(), 1);
    assert_eq!(paged.page, 2);
}

async fn story_search_folds_non_ascii_case(store: &dyn Store) {
    store
        .create_story(&story_input("Đảo Hoang", StoryKind::Novel))
        .await
        .unwrap();
    store
        .create_story(&StoryInput {
            author: "Nguyễn Nhật Ánh".into(),
            ..story_input("Mắt Biếc", StoryKind::Novel)
        })
        .await
        .unwrap();

    let cases = [
        ("đảo", 1),
        ("ĐẢO HOANG", 1),
        ("ánh", 1),
        ("NHẬT", 1),
        ("biếc", 1),
        ("x%", 0),
    ];
    for (term, expected) in cases {
        let page = store
            .list_stories(&StoryQuery {
                search: Some(term.into()),
                ..StoryQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, expected, "search {:?}", term);
    }
}

async fn listed(store: &dyn Store, query: StoryQuery) -> Page<Story> {
    store.list_stories(&query).await.unwrap()
}

// --- Concurrency ---

async fn concurrent_progress_converges_on_one_row(store: Arc<dyn Store>) {
    let reader = user(store.as_ref(), "reader").await;
    let story_id = story(store.as_ref(), "Tidewater").await;
    let mut chapters = Vec::new();
    for number in 1..=8 {
        chapters.push(chapter(store.as_ref(), story_id, number).await);
    }

    let mut tasks = JoinSet::new();
    for &chapter_id in &chapters {
        let store = Arc::clone(&store);
        tasks.spawn(async move { store.record_progress(reader, story_id, chapter_id).await });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    let history = store.list_progress(reader).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(chapters.contains(&history[0].history.chapter_id));
}

async fn concurrent_signups_make_one_admin(store: Arc<dyn Store>) {
    let mut tasks = JoinSet::new();
    for n in 0..6 {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            store
                .create_user(NewUser {
                    username: format!("reader{}", n),
                    password_hash: "hash".into(),
                    is_admin: false,
                })
                .await
        });
    }

    let mut admins = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().unwrap().is_admin {
            admins += 1;
        }
    }
    assert_eq!(admins, 1);
    assert_eq!(store.user_count().await.unwrap(), 6);
}
