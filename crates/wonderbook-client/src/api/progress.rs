use reqwest::Method;
use serde_json::{Value, json};
use wonderbook_core::{BookId, ReadingPosition};

use super::WonderbookApi;
use crate::error::{ApiError, Result};

impl WonderbookApi {
    /// Last saved position, `None` if the book was never opened.
    pub async fn reading_position(&self, book_id: BookId) -> Result<Option<ReadingPosition>> {
        self.require_auth("reading progress")?;
        let id = book_id.to_string();
        match self.http.get_value(self.http.url(&["progress", &id])).await {
            Ok(body) => Ok(position_from_body(body)),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn save_reading_position(
        &self,
        book_id: BookId,
        position: &ReadingPosition,
    ) -> Result<()> {
        self.require_auth("reading progress")?;
        let id = book_id.to_string();
        self.http
            .execute(
                Method::POST,
                self.http.url(&["progress", &id]),
                Some(&json!({ "position": position })),
            )
            .await
    }
}

/// `{"position": "..."}` or a bare string; anything else is no position.
fn position_from_body(body: Value) -> Option<ReadingPosition> {
    let token = match body {
        Value::String(s) => s,
        Value::Object(mut map) => match map.remove("position") {
            Some(Value::String(s)) => s,
            _ => return None,
        },
        _ => return None,
    };
    (!token.is_empty()).then(|| ReadingPosition(token))
}
