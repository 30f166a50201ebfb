use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WonderbookError};
use crate::models::book::null_as_default;
use crate::models::{BookId, UserId};

pub type CommentId = i64;

/// Highest rating a reader can give.
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "commentId")]
    pub id: CommentId,

    #[serde(rename = "bookId")]
    pub book_id: BookId,

    #[serde(rename = "userId")]
    pub user_id: UserId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<CommentAuthor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Body of a create-or-update comment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentDraft {
    #[serde(rename = "bookId")]
    pub book_id: BookId,
    pub content: String,
    pub rating: u8,
}

impl CommentDraft {
    pub fn new(book_id: BookId, content: impl Into<String>, rating: u8) -> Self {
        Self {
            book_id,
            content: content.into(),
            rating,
        }
    }

    /// Rejects drafts that must never reach the network.
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(WonderbookError::ValidationError(
                "comment cannot be empty".to_string(),
            ));
        }
        if self.rating > MAX_RATING {
            return Err(WonderbookError::ValidationError(format!(
                "rating must be between 0 and {MAX_RATING}, got {}",
                self.rating
            )));
        }
        Ok(())
    }
}

/// Applies a server-confirmed comment to a cached list: one comment per
/// (book, user), the latest one wins, new pairs are appended.
pub fn upsert_comment(comments: &mut Vec<Comment>, comment: Comment) {
    match comments
        .iter_mut()
        .find(|c| c.book_id == comment.book_id && c.user_id == comment.user_id)
    {
        Some(existing) => *existing = comment,
        None => comments.push(comment),
    }
}

/// Mean rating over a comment list, `None` when nobody rated.
pub fn average_rating(comments: &[Comment]) -> Option<f32> {
    if comments.is_empty() {
        return None;
    }
    let total: u32 = comments.iter().map(|c| u32::from(c.rating)).sum();
    Some(total as f32 / comments.len() as f32)
}
