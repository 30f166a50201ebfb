//! Typed endpoints of the Wonderbook REST API, one file per resource.

mod books;
mod collection;
mod comments;
mod progress;

pub use books::{BookInput, BookQuery};
pub use collection::CollectionQuery;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;
use wonderbook_core::list::items_from_payload;
use wonderbook_core::{ApiConfig, AuthState, UserId};

use crate::error::{ApiError, Result};
use crate::http::HttpClient;
use crate::session::Session;

pub struct WonderbookApi {
    http: HttpClient,
    user_id: Option<UserId>,
}

impl WonderbookApi {
    /// Anonymous client: catalog reads only.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            user_id: None,
        })
    }

    /// Client acting for the stored session, if any.
    pub fn with_session(config: &ApiConfig, session: Option<&Session>) -> Result<Self> {
        let http = HttpClient::new(config)?.with_token(session.map(|s| s.token.clone()));
        Ok(Self {
            http,
            user_id: session.map(|s| s.user_id),
        })
    }

    pub fn auth_state(&self) -> AuthState {
        match self.user_id {
            Some(id) if self.http.has_token() => AuthState::signed_in(id),
            _ => AuthState::anonymous(),
        }
    }

    /// Fails fast for endpoints that need a signed-in user.
    fn require_auth(&self, what: &str) -> Result<UserId> {
        match self.auth_state() {
            AuthState {
                authenticated: true,
                user_id: Some(id),
            } => Ok(id),
            _ => Err(ApiError::Unauthorized(format!("{what} requires a session"))),
        }
    }
}

/// Listing body as records. A body that is not a list reads as empty.
fn list_or_empty<T: DeserializeOwned>(body: Value, what: &str) -> Vec<T> {
    items_from_payload(body).unwrap_or_else(|| {
        warn!(what, "response is not a list; treating it as empty");
        Vec::new()
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use wonderbook_core::ApiConfig;

    use super::WonderbookApi;
    use crate::session::Session;

    pub fn api(base_url: &str) -> WonderbookApi {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        let session = Session::new("tok", 7).unwrap();
        WonderbookApi::with_session(&config, Some(&session)).unwrap()
    }

    pub fn anonymous(base_url: &str) -> WonderbookApi {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        WonderbookApi::new(&config).unwrap()
    }
}
