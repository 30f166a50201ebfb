use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use wonderbook_core::{BookId, BookRecord, Category, CombinationMode, FilterSelection, YearFilter};

use super::{WonderbookApi, list_or_empty};
use crate::error::Result;
use crate::http::append_params;

/// Server-side filters for the catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub categories: Vec<String>,
    pub mode: CombinationMode,
    pub year: YearFilter,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl BookQuery {
    pub fn from_selection(selection: &FilterSelection) -> Self {
        Self {
            categories: selection.categories.clone(),
            mode: selection.mode,
            year: selection.year,
            search: selection.search_needle(),
            page: None,
            limit: None,
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if !self.categories.is_empty() {
            params.push(("categories", self.categories.join(",")));
            params.push(("type", self.mode.as_param().to_string()));
        }
        match self.year {
            YearFilter::Year(y) => params.push(("year", y.to_string())),
            YearFilter::Range(start, end) if self.year.is_active() => {
                params.push(("start", start.to_string()));
                params.push(("end", end.to_string()));
            }
            _ => {}
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Body for admin create/update calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub categories: Vec<String>,
    pub editors: Vec<String>,
    pub summary: String,
    pub cover_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebook_url: Option<String>,
}

impl WonderbookApi {
    /// Raw listing body, shape untouched (array or `{books, total}`).
    pub async fn list_books_raw(&self, query: &BookQuery) -> Result<Value> {
        let mut url = self.http.url(&["books"]);
        append_params(&mut url, &query.params());
        self.http.get_value(url).await
    }

    /// Listing normalized to records; unexpected shapes read as empty.
    pub async fn list_books(&self, query: &BookQuery) -> Result<Vec<BookRecord>> {
        let body = self.list_books_raw(query).await?;
        Ok(list_or_empty(body, "book listing"))
    }

    pub async fn book(&self, id: BookId) -> Result<BookRecord> {
        let id = id.to_string();
        self.http.get_json(self.http.url(&["books", &id])).await
    }

    pub async fn book_by_title(&self, title: &str) -> Result<BookRecord> {
        self.http.get_json(self.http.url(&["books", "title", title])).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let body = self.http.get_value(self.http.url(&["categories"])).await?;
        Ok(list_or_empty(body, "categories"))
    }

    pub async fn create_book(&self, input: &BookInput) -> Result<BookRecord> {
        self.require_auth("creating a book")?;
        self.http.post_json(self.http.url(&["books"]), input).await
    }

    pub async fn update_book(&self, id: BookId, input: &BookInput) -> Result<BookRecord> {
        self.require_auth("updating a book")?;
        let id = id.to_string();
        self.http.put_json(self.http.url(&["books", &id]), input).await
    }

    pub async fn delete_book(&self, id: BookId) -> Result<()> {
        self.require_auth("deleting a book")?;
        let id = id.to_string();
        self.http
            .execute::<()>(Method::DELETE, self.http.url(&["books", &id]), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use super::*;
    use crate::api::test_support::{anonymous, api};
    use crate::error::ApiError;

    #[tokio::test]
    async fn list_books_sends_filters_as_query() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/books")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("categories".into(), "Fiction,Drama".into()),
                Matcher::UrlEncoded("type".into(), "ou".into()),
                Matcher::UrlEncoded("start".into(), "2018".into()),
                Matcher::UrlEncoded("end".into(), "2022".into()),
                Matcher::UrlEncoded("search".into(), "tolkien".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "books": [{"bookId": 1, "title": "The Hobbit", "author": "J.R.R. Tolkien"}],
                    "total": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let selection = FilterSelection {
            categories: vec!["Fiction".into(), "Drama".into()],
            mode: CombinationMode::Or,
            year: YearFilter::Range(2018, 2022),
            search: "  Tolkien ".into(),
            ..Default::default()
        };
        let books = anonymous(&server.url())
            .list_books(&BookQuery::from_selection(&selection))
            .await
            .unwrap();

        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "The Hobbit");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn list_books_tolerates_odd_shapes() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/books")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("null")
            .create_async()
            .await;

        let books = anonymous(&server.url())
            .list_books(&BookQuery::default())
            .await
            .unwrap();
        assert!(books.is_empty());
    }

    #[test]
    fn inactive_filters_are_not_sent() {
        let query = BookQuery {
            year: YearFilter::Range(2022, 2018),
            search: Some("   ".into()),
            ..Default::default()
        };
        assert!(query.params().is_empty());

        let exact = BookQuery {
            year: YearFilter::Year(2020),
            ..Default::default()
        };
        assert_eq!(exact.params(), vec![("year", "2020".to_string())]);
    }

    #[tokio::test]
    async fn fetch_by_id_and_title() {
        let mut server = Server::new_async().await;
        let _a = server
            .mock("GET", "/books/3")
            .with_status(200)
            .with_body(
                json!({
                    "bookId": 3,
                    "title": "Dune",
                    "author": "Frank Herbert",
                    "date": "1965-08-01"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/books/title/Le%20Petit%20Prince")
            .with_status(200)
            .with_body(r#"{"bookId": 4, "title": "Le Petit Prince", "author": "Saint-Exupéry"}"#)
            .create_async()
            .await;

        let api = anonymous(&server.url());
        let dune = api.book(3).await.unwrap();
        assert_eq!(dune.publication_year(), Some(1965));
        let prince = api.book_by_title("Le Petit Prince").await.unwrap();
        assert_eq!(prince.id, 4);
    }

    #[tokio::test]
    async fn admin_calls_need_a_session() {
        let server = Server::new_async().await;
        let err = anonymous(&server.url()).delete_book(1).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn delete_book_with_session() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("DELETE", "/books/9")
            .match_header("authorization", "Bearer tok")
            .with_status(204)
            .create_async()
            .await;

        api(&server.url()).delete_book(9).await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn categories_accept_objects_or_names() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/categories")
            .with_status(200)
            .with_body(r#"[{"id": 1, "name": "Fantasy"}, "Poetry"]"#)
            .create_async()
            .await;

        let categories = anonymous(&server.url()).categories().await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Fantasy", "Poetry"]);
    }

    #[tokio::test]
    async fn categories_that_are_not_a_list_read_as_empty() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/categories")
            .with_status(200)
            .with_body(r#"{"error": "maintenance"}"#)
            .create_async()
            .await;

        let categories = anonymous(&server.url()).categories().await.unwrap();
        assert!(categories.is_empty());
    }

    #[tokio::test]
    async fn create_and_update_send_the_book_body() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/books")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({
                "title": "Dune",
                "author": "Frank Herbert",
                "date": "1965-08-01",
                "categories": ["SF"],
                "editors": ["Chilton"],
                "summary": "",
                "cover_url": ""
            })))
            .with_status(201)
            .with_body(r#"{"bookId": 12, "title": "Dune", "author": "Frank Herbert"}"#)
            .create_async()
            .await;
        let update = server
            .mock("PUT", "/books/12")
            .match_body(Matcher::PartialJson(json!({"title": "Dune Messiah"})))
            .with_status(200)
            .with_body(r#"{"bookId": 12, "title": "Dune Messiah", "author": "Frank Herbert"}"#)
            .create_async()
            .await;

        let api = api(&server.url());
        let mut input = BookInput {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            date: Some("1965-08-01".into()),
            categories: vec!["SF".into()],
            editors: vec!["Chilton".into()],
            ..Default::default()
        };
        let created = api.create_book(&input).await.unwrap();
        assert_eq!(created.id, 12);

        input.title = "Dune Messiah".into();
        let updated = api.update_book(created.id, &input).await.unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn create_needs_a_session() {
        let mut server = Server::new_async().await;
        let m = server.mock("POST", "/books").expect(0).create_async().await;
        let err = anonymous(&server.url())
            .create_book(&BookInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        m.assert_async().await;
    }
}
