use serde::{Deserialize, Serialize};

use crate::models::book::null_as_default;
use crate::models::{BookId, BookRecord, UserId};

pub type CollectionId = i64;

/// One user-book pairing in a personal collection. The server guarantees at
/// most one per (user, book).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    #[serde(rename = "collectionId")]
    pub id: CollectionId,

    #[serde(rename = "userId")]
    pub user_id: UserId,

    #[serde(rename = "bookId")]
    pub book_id: BookId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,

    /// Nested book payload; the API occasionally returns `null` for books
    /// that were deleted after being collected.
    #[serde(rename = "books", default)]
    pub book: Option<BookRecord>,
}

impl CollectionItem {
    /// Whether the collection owner left a comment on this book.
    pub fn has_own_comment(&self) -> bool {
        self.book
            .as_ref()
            .is_some_and(|b| b.comments.iter().any(|c| c.user_id == self.user_id))
    }
}
