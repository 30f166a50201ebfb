use reqwest::Method;
use wonderbook_core::{BookId, Comment, CommentDraft, CommentId};

use super::{WonderbookApi, list_or_empty};
use crate::error::Result;

impl WonderbookApi {
    pub async fn comments_for(&self, book_id: BookId) -> Result<Vec<Comment>> {
        let id = book_id.to_string();
        let body = self.http.get_value(self.http.url(&["comments", "book", &id])).await?;
        Ok(list_or_empty(body, "comments"))
    }

    /// Creates the caller's comment on a book, or replaces it if one exists.
    /// Drafts that fail validation never reach the network.
    pub async fn submit_comment(&self, draft: &CommentDraft) -> Result<Comment> {
        draft.validate()?;
        self.require_auth("commenting")?;
        self.http.post_json(self.http.url(&["comments"]), draft).await
    }

    pub async fn delete_comment(&self, id: CommentId) -> Result<()> {
        self.require_auth("deleting a comment")?;
        let id = id.to_string();
        self.http
            .execute::<()>(Method::DELETE, self.http.url(&["comments", &id]), None)
            .await
    }

    /// Moderator delete of any user's comment.
    pub async fn admin_delete_comment(&self, id: CommentId) -> Result<()> {
        self.require_auth("moderating comments")?;
        let id = id.to_string();
        self.http
            .execute::<()>(Method::DELETE, self.http.url(&["admin", "comments", &id]), None)
            .await
    }
}
