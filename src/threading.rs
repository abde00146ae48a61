//! Two-level comment threads: top-level comments with their direct replies.

use serde::Serialize;

use crate::db::models::{Comment, CommentView};

/// Anything that sits in a comment thread.
pub trait ThreadNode {
    fn node_id(&self) -> i64;
    fn parent_id(&self) -> Option<i64>;
}

impl ThreadNode for Comment {
    fn node_id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }
}

impl ThreadNode for CommentView {
    fn node_id(&self) -> i64 {
        self.comment.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.comment.parent_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threaded<T> {
    #[serde(flatten)]
    pub comment: T,
    pub replies: Vec<T>,
}

/// Group a flat comment list into top-level entries with their replies.
///
/// Top-level order and reply order are both taken from the input. A reply
/// whose parent is itself a reply has no top-level entry to attach to and
/// is left out of the result.
pub fn thread_comments<T: ThreadNode>(flat: Vec<T>) -> Vec<Threaded<T>> {
    let (top_level, replies): (Vec<T>, Vec<T>) =
        flat.into_iter().partition(|c| c.parent_id().is_none());

    let mut threads: Vec<Threaded<T>> = top_level
        .into_iter()
        .map(|comment| Threaded {
            comment,
            replies: Vec::new(),
        })
        .collect();

    for reply in replies {
        let parent = reply.parent_id();
        match threads
            .iter_mut()
            .find(|t| Some(t.comment.node_id()) == parent)
        {
            Some(thread) => thread.replies.push(reply),
            None => tracing::debug!(
                comment_id = reply.node_id(),
                parent_id = ?parent,
                "Dropping comment without a top-level parent"
            ),
        }
    }

    threads
}
