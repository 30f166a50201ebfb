//! Fetch lifecycle and page windows for list views.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::pagination::{DEFAULT_PAGE_SIZE, page_count, paginate};

/// Something that can produce the full candidate list for a query.
///
/// Sources return the raw JSON body; the controller owns shape normalization.
#[async_trait]
pub trait ListSource: Send + Sync {
    type Query: Send + Sync;
    type Item: DeserializeOwned + Clone + Send + Sync;

    async fn fetch(&self, query: &Self::Query) -> std::result::Result<Value, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Errored,
}

#[derive(Debug)]
struct ListState<T> {
    status: ListStatus,
    items: Vec<T>,
    error: Option<String>,
    current_page: usize,
    generation: u64,
}

/// Point-in-time copy of a list, for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ListSnapshot<T> {
    pub status: ListStatus,
    pub items: Vec<T>,
    pub error: Option<String>,
    pub current_page: usize,
    pub page_size: usize,
}

impl<T> ListSnapshot<T> {
    pub fn page_items(&self) -> &[T] {
        paginate(&self.items, self.current_page, self.page_size)
    }

    pub fn page_count(&self) -> usize {
        page_count(self.items.len(), self.page_size)
    }
}

/// Paginated list bound to a [`ListSource`].
///
/// Cloning yields another handle on the same list. Every [`reload`] takes a
/// new generation; a response that is no longer the latest is dropped, so the
/// last reload issued is the one that ends up displayed.
///
/// [`reload`]: PaginatedList::reload
pub struct PaginatedList<S: ListSource> {
    source: Arc<S>,
    state: Arc<Mutex<ListState<S::Item>>>,
    page_size: usize,
}

impl<S: ListSource> Clone for PaginatedList<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: Arc::clone(&self.state),
            page_size: self.page_size,
        }
    }
}

impl<S: ListSource> PaginatedList<S> {
    pub fn new(source: S) -> Self {
        Self::with_page_size(source, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(source: S, page_size: usize) -> Self {
        Self {
            source: Arc::new(source),
            state: Arc::new(Mutex::new(ListState {
                status: ListStatus::Idle,
                items: Vec::new(),
                error: None,
                current_page: 1,
                generation: 0,
            })),
            page_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState<S::Item>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the full list for `query`. Items from the previous load stay
    /// visible while the request is in flight. Failures end up in the list
    /// state, never in the return value.
    pub async fn reload(&self, query: &S::Query) -> ListStatus {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.status = ListStatus::Loading;
            state.generation
        };
        debug!(generation, "list fetch started");

        let outcome = self.source.fetch(query).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, latest = state.generation, "dropping stale list response");
            return state.status;
        }

        match outcome {
            Ok(payload) => {
                state.items = items_from_payload(payload).unwrap_or_else(|| {
                    warn!(generation, "list response is not a list; showing nothing");
                    Vec::new()
                });
                state.error = None;
                state.status = ListStatus::Ready;
                debug!(generation, count = state.items.len(), "list fetch finished");
            }
            Err(err) => {
                warn!(generation, error = %err, "list fetch failed");
                state.items.clear();
                state.error = Some(err.to_string());
                state.status = ListStatus::Errored;
            }
        }
        state.status
    }

    /// Keeps the list in step with a watched value such as the
    /// [`FilterStore`](crate::filter::FilterStore) selection: one reload for
    /// the current value, then one per change, each back on page 1.
    ///
    /// Reloads run concurrently, so a slow response never holds up a newer
    /// query; the generation check keeps only the latest. Returns once the
    /// sender is gone and the last reload has settled.
    pub async fn follow<T, F>(&self, mut changes: watch::Receiver<T>, to_query: F)
    where
        S: 'static,
        S::Query: 'static,
        S::Item: 'static,
        F: Fn(&T) -> S::Query,
    {
        let mut in_flight = JoinSet::new();
        loop {
            let query = {
                let current = changes.borrow_and_update();
                to_query(&*current)
            };
            self.set_current_page(1);
            let list = self.clone();
            in_flight.spawn(async move { list.reload(&query).await });
            while in_flight.try_join_next().is_some() {}

            if changes.changed().await.is_err() {
                break;
            }
        }
        while in_flight.join_next().await.is_some() {}
    }

    pub fn status(&self) -> ListStatus {
        self.lock().status
    }

    pub fn is_loading(&self) -> bool {
        self.status() == ListStatus::Loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn items(&self) -> Vec<S::Item> {
        self.lock().items.clone()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.lock().current_page
    }

    /// Moves the page window. Out-of-range pages are allowed and render empty.
    pub fn set_current_page(&self, page: usize) {
        self.lock().current_page = page;
    }

    pub fn page_items(&self) -> Vec<S::Item> {
        let state = self.lock();
        paginate(&state.items, state.current_page, self.page_size).to_vec()
    }

    pub fn page_count(&self) -> usize {
        page_count(self.lock().items.len(), self.page_size)
    }

    pub fn snapshot(&self) -> ListSnapshot<S::Item> {
        let state = self.lock();
        ListSnapshot {
            status: state.status,
            items: state.items.clone(),
            error: state.error.clone(),
            current_page: state.current_page,
            page_size: self.page_size,
        }
    }
}

/// Accepts a bare JSON array or a `{ "books": [...] }` envelope. Entries that
/// don't deserialize are skipped. Any other shape yields `None`.
pub fn items_from_payload<T: DeserializeOwned>(payload: Value) -> Option<Vec<T>> {
    let raw = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("books") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };

    Some(
        raw.into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "skipping malformed list entry");
                    None
                }
            })
            .collect(),
    )
}
