pub mod config;
pub mod error;
pub mod filter;
pub mod list;
pub mod models;
pub mod pagination;

pub use config::{ApiConfig, AppConfig, CatalogConfig, LoggingConfig};
pub use error::{ExitCode, Result, SourceError, WonderbookError};
pub use models::*;

pub use filter::{
    BookOrder, CombinationMode, FilterAction, FilterSelection, FilterStore, ReadFilter, YearBounds,
    YearFilter, YearInput, YearMode, filter_books, filter_collection, sort_books,
};
pub use list::{ListSnapshot, ListSource, ListStatus, PaginatedList};
pub use pagination::{DEFAULT_PAGE_SIZE, paginate};
