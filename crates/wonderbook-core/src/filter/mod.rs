//! Filter selection shared by every list view, and the predicates that apply it.
//!
//! ```text
//! controls ──FilterAction──▶ FilterStore ──watch──▶ views
//!                                 │
//!                          FilterSelection ──▶ engine::filter_collection / filter_books
//! ```

pub mod engine;
pub mod selection;
pub mod store;
pub mod year;

pub use engine::{BookOrder, CompiledFilter, filter_books, filter_collection, sort_books};
pub use selection::{CombinationMode, FilterSelection, MAX_SELECTED_CATEGORIES, ReadFilter};
pub use store::{FilterAction, FilterState, FilterStore};
pub use year::{YearBounds, YearDraft, YearFilter, YearInput, YearMode};
