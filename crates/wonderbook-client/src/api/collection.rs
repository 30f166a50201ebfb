use reqwest::Method;
use serde_json::{Value, json};
use wonderbook_core::{BookId, CollectionItem, FilterSelection};

use super::{WonderbookApi, list_or_empty};
use crate::error::Result;
use crate::http::append_params;

/// Prefilters the server applies before the collection reaches the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    pub is_read: Option<bool>,
    pub is_noted: Option<bool>,
    pub is_commented: Option<bool>,
}

impl CollectionQuery {
    pub fn from_selection(selection: &FilterSelection) -> Self {
        Self {
            is_read: selection.read.as_query_flag(),
            is_noted: None,
            is_commented: selection.commented.then_some(true),
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        [
            ("is_read", self.is_read),
            ("is_noted", self.is_noted),
            ("is_commented", self.is_commented),
        ]
        .into_iter()
        .filter_map(|(key, flag)| flag.map(|f| (key, f.to_string())))
        .collect()
    }
}

impl WonderbookApi {
    pub async fn collection_raw(&self, query: &CollectionQuery) -> Result<Value> {
        self.require_auth("reading the collection")?;
        let mut url = self.http.url(&["collections"]);
        append_params(&mut url, &query.params());
        self.http.get_value(url).await
    }

    pub async fn collection(&self, query: &CollectionQuery) -> Result<Vec<CollectionItem>> {
        let body = self.collection_raw(query).await?;
        Ok(list_or_empty(body, "collection"))
    }

    pub async fn add_to_collection(&self, book_id: BookId) -> Result<()> {
        self.require_auth("adding to the collection")?;
        self.http
            .execute(
                Method::POST,
                self.http.url(&["collections"]),
                Some(&json!({ "bookId": book_id })),
            )
            .await
    }

    pub async fn remove_from_collection(&self, book_id: BookId) -> Result<()> {
        self.require_auth("removing from the collection")?;
        let id = book_id.to_string();
        self.http
            .execute::<()>(Method::DELETE, self.http.url(&["collections", &id]), None)
            .await
    }

    /// Read status only ever moves to `true`.
    pub async fn mark_read(&self, book_id: BookId) -> Result<()> {
        self.require_auth("marking a book read")?;
        let id = book_id.to_string();
        self.http
            .execute(
                Method::PATCH,
                self.http.url(&["collections", &id, "read"]),
                Some(&json!({ "is_read": true })),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;
    use wonderbook_core::{ReadFilter, filter_collection};

    use super::*;
    use crate::api::test_support::{anonymous, api};
    use crate::error::ApiError;

    #[tokio::test]
    async fn collection_prefilters_and_local_filter() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/collections")
            .match_query(Matcher::UrlEncoded("is_read".into(), "false".into()))
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(
                json!([
                    {"collectionId": 1, "userId": 7, "bookId": 1, "is_read": false,
                     "books": {"bookId": 1, "title": "Dune", "author": "Frank Herbert"}},
                    {"collectionId": 2, "userId": 7, "bookId": 2, "is_read": false, "books": null},
                    {"collectionId": 3, "userId": 7, "bookId": 3, "is_read": true,
                     "books": {"bookId": 3, "title": "Emma", "author": "Jane Austen"}}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let selection = FilterSelection {
            read: ReadFilter::Unread,
            ..Default::default()
        };
        let items = api(&server.url())
            .collection(&CollectionQuery::from_selection(&selection))
            .await
            .unwrap();
        m.assert_async().await;
        assert_eq!(items.len(), 3);

        // The server filter is re-checked locally; the null book is dropped too.
        let visible = filter_collection(&items, &selection);
        assert_eq!(visible.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn membership_and_read_status() {
        let mut server = Server::new_async().await;
        let add = server
            .mock("POST", "/collections")
            .match_body(Matcher::Json(json!({"bookId": 5})))
            .with_status(201)
            .with_body("{}")
            .create_async()
            .await;
        let read = server
            .mock("PATCH", "/collections/5/read")
            .match_body(Matcher::Json(json!({"is_read": true})))
            .with_status(200)
            .create_async()
            .await;
        let remove = server
            .mock("DELETE", "/collections/5")
            .with_status(204)
            .create_async()
            .await;

        let api = api(&server.url());
        api.add_to_collection(5).await.unwrap();
        api.mark_read(5).await.unwrap();
        api.remove_from_collection(5).await.unwrap();
        add.assert_async().await;
        read.assert_async().await;
        remove.assert_async().await;
    }

    #[tokio::test]
    async fn collection_needs_session() {
        let server = Server::new_async().await;
        let err = anonymous(&server.url())
            .collection(&CollectionQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn commented_flag_maps_to_query() {
        let selection = FilterSelection {
            commented: true,
            ..Default::default()
        };
        let query = CollectionQuery::from_selection(&selection);
        assert_eq!(query.params(), vec![("is_commented", "true".to_string())]);
    }
}
