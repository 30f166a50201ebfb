//! Wonderbook client: REST endpoints, session storage and list sources.

pub mod api;
pub mod error;
pub mod http;
pub mod session;
pub mod sources;

pub use api::{BookInput, BookQuery, CollectionQuery, WonderbookApi};
pub use error::{ApiError, Result};
pub use session::Session;
pub use sources::{CatalogSource, CollectionSource};
