//! [`ListSource`] adapters so list controllers can drive the API.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use wonderbook_core::{BookRecord, CollectionItem, ListSource, SourceError};

use crate::api::{BookQuery, CollectionQuery, WonderbookApi};

/// Catalog listing (home view).
pub struct CatalogSource {
    api: Arc<WonderbookApi>,
}

impl CatalogSource {
    pub fn new(api: Arc<WonderbookApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListSource for CatalogSource {
    type Query = BookQuery;
    type Item = BookRecord;

    async fn fetch(&self, query: &BookQuery) -> Result<Value, SourceError> {
        self.api.list_books_raw(query).await.map_err(SourceError::from)
    }
}

/// The signed-in user's collection, server prefilters applied.
pub struct CollectionSource {
    api: Arc<WonderbookApi>,
}

impl CollectionSource {
    pub fn new(api: Arc<WonderbookApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ListSource for CollectionSource {
    type Query = CollectionQuery;
    type Item = CollectionItem;

    async fn fetch(&self, query: &CollectionQuery) -> Result<Value, SourceError> {
        self.api.collection_raw(query).await.map_err(SourceError::from)
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use wonderbook_core::{ListStatus, PaginatedList};

    use super::*;
    use crate::api::test_support::{anonymous, api};

    #[tokio::test]
    async fn catalog_list_pages_over_api() {
        let mut server = Server::new_async().await;
        let body: Vec<_> = (1..=12)
            .map(|i| serde_json::json!({"bookId": i, "title": format!("Book {i}"), "author": "A"}))
            .collect();
        let _m = server
            .mock("GET", "/books")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(Value::Array(body).to_string())
            .create_async()
            .await;

        let list = PaginatedList::new(CatalogSource::new(Arc::new(anonymous(&server.url()))));
        assert_eq!(list.reload(&BookQuery::default()).await, ListStatus::Ready);
        assert_eq!(list.page_count(), 2);
        list.set_current_page(2);
        assert_eq!(list.page_items().len(), 2);
    }

    #[tokio::test]
    async fn server_error_becomes_list_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/collections")
            .with_status(500)
            .with_body("db down")
            .create_async()
            .await;

        let list = PaginatedList::new(CollectionSource::new(Arc::new(api(&server.url()))));
        assert_eq!(list.reload(&CollectionQuery::default()).await, ListStatus::Errored);
        assert!(list.items().is_empty());
        assert!(list.error().unwrap().contains("db down"));
    }
}
