use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::RETRY_AFTER;
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;
use wonderbook_core::ApiConfig;

use crate::error::{ApiError, Result};

/// Transport shared by every endpoint: base URL, bearer token, request
/// spacing and bounded retries.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    max_retries: u32,
}

impl HttpClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .gzip(true);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
            token: None,
            min_interval: Duration::from_millis(config.min_interval_ms),
            last_request: Arc::new(Mutex::new(None)),
            max_retries: config.max_retries,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// `base_url` joined with the given path segments (each percent-encoded).
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().extend(segments);
        }
        url
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(t) = *last {
            let elapsed = t.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Sends a request and returns the body text of a 2xx response.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_rate_limit().await;
            debug!(%method, %url, attempt, "api request");

            let mut req = self.client.request(method.clone(), url.clone());
            if let Some(token) = &self.token {
                req = req.bearer_auth(token);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            match req.send().await {
                Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let wait = r
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    if attempt >= self.max_retries {
                        return Err(ApiError::RateLimit(url.to_string(), wait));
                    }
                    sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                Ok(r)
                    if r.status() == StatusCode::UNAUTHORIZED
                        || r.status() == StatusCode::FORBIDDEN =>
                {
                    return Err(ApiError::Unauthorized(format!("{method} {}", url.path())));
                }
                Ok(r) if r.status() == StatusCode::NOT_FOUND => {
                    return Err(ApiError::NotFound(url.path().to_string()));
                }
                Ok(r) if !r.status().is_success() => {
                    let status = r.status().as_u16();
                    let body = r.text().await.unwrap_or_default();
                    return Err(ApiError::Status {
                        url: url.to_string(),
                        status,
                        body,
                    });
                }
                Ok(r) => return r.text().await.map_err(ApiError::Http),
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(ApiError::Http(e));
                    }
                    let backoff = backoff_secs(attempt);
                    sleep(Duration::from_secs(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// GET returning the raw JSON body. An empty body reads as `null`.
    pub async fn get_value(&self, url: Url) -> Result<Value> {
        let text = self.send::<()>(Method::GET, url, None).await?;
        parse_value(&text)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let text = self.send::<()>(Method::GET, url, None).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    pub async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<R> {
        let text = self.send(Method::POST, url, Some(body)).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    pub async fn put_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<R> {
        let text = self.send(Method::PUT, url, Some(body)).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Request whose response body is irrelevant.
    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<()> {
        self.send(method, url, body).await.map(|_| ())
    }
}

/// Adds query pairs, leaving the URL untouched when there are none.
pub(crate) fn append_params(url: &mut Url, params: &[(&str, String)]) {
    if params.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in params {
        pairs.append_pair(key, value);
    }
}

/// Exponential transport backoff, capped at a minute.
fn backoff_secs(attempt: u32) -> u64 {
    2u64.saturating_pow(attempt).min(60)
}

fn parse_value(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn url_joins_segments() {
        let client = HttpClient::new(&config("http://localhost:3000/api/")).unwrap();
        assert_eq!(
            client.url(&["books", "title", "Le Petit Prince"]).as_str(),
            "http://localhost:3000/api/books/title/Le%20Petit%20Prince"
        );
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(
            HttpClient::new(&config("not a url")),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_secs(0), 1);
        assert_eq!(backoff_secs(3), 8);
        assert_eq!(backoff_secs(6), 60);
        assert_eq!(backoff_secs(64), 60);
        assert_eq!(backoff_secs(u32::MAX), 60);
    }

    #[test]
    fn append_params_skips_empty() {
        let mut url = Url::parse("http://localhost/collections").unwrap();
        append_params(&mut url, &[]);
        assert_eq!(url.as_str(), "http://localhost/collections");
        append_params(&mut url, &[("is_read", "true".to_string())]);
        assert_eq!(url.as_str(), "http://localhost/collections?is_read=true");
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = HttpClient::new(&config(&server.url()))
            .unwrap()
            .with_token(Some("secret".to_string()));
        let value = client.get_value(client.url(&["ping"])).await.unwrap();
        assert_eq!(value, Value::Array(vec![]));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let mut server = Server::new_async().await;
        let _a = server.mock("GET", "/private").with_status(401).create_async().await;
        let _b = server.mock("GET", "/missing").with_status(404).create_async().await;
        let _c = server
            .mock("GET", "/broken")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let _d = server
            .mock("GET", "/busy")
            .with_status(429)
            .with_header("retry-after", "3")
            .create_async()
            .await;

        let client = HttpClient::new(&config(&server.url())).unwrap();
        assert!(matches!(
            client.get_value(client.url(&["private"])).await,
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            client.get_value(client.url(&["missing"])).await,
            Err(ApiError::NotFound(_))
        ));
        match client.get_value(client.url(&["broken"])).await {
            Err(ApiError::Status { status, body, .. }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            client.get_value(client.url(&["busy"])).await,
            Err(ApiError::RateLimit(_, 3))
        ));
    }

    #[tokio::test]
    async fn empty_body_reads_as_null() {
        let mut server = Server::new_async().await;
        let _m = server.mock("GET", "/empty").with_status(200).create_async().await;

        let client = HttpClient::new(&config(&server.url())).unwrap();
        assert_eq!(client.get_value(client.url(&["empty"])).await.unwrap(), Value::Null);
    }
}
