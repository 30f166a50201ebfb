use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WonderbookError;
use crate::filter::{CombinationMode, FilterSelection, ReadFilter, YearFilter};
use crate::models::{BookRecord, CollectionItem};

/// A selection prepared for repeated matching (search text lowercased once).
#[derive(Debug, Clone)]
pub struct CompiledFilter<'a> {
    categories: &'a [String],
    mode: CombinationMode,
    year: YearFilter,
    needle: Option<String>,
    read: ReadFilter,
    commented: bool,
}

impl<'a> CompiledFilter<'a> {
    pub fn new(selection: &'a FilterSelection) -> Self {
        Self {
            categories: &selection.categories,
            mode: selection.mode,
            year: selection.year,
            needle: selection.search_needle(),
            read: selection.read,
            commented: selection.commented,
        }
    }

    /// Collection predicates, all required, cheapest first.
    pub fn matches_item(&self, item: &CollectionItem) -> bool {
        let Some(book) = item.book.as_ref() else {
            return false;
        };
        if !self.read.matches(item.is_read) {
            return false;
        }
        if self.commented && !item.has_own_comment() {
            return false;
        }
        self.matches_book(book)
    }

    /// Catalog predicates: categories, year, search.
    pub fn matches_book(&self, book: &BookRecord) -> bool {
        self.categories_match(book)
            && self.year.matches(book.publication_year())
            && self.search_matches(book)
    }

    fn categories_match(&self, book: &BookRecord) -> bool {
        if self.categories.is_empty() {
            return true;
        }
        match self.mode {
            CombinationMode::And => self.categories.iter().all(|c| book.has_category(c)),
            CombinationMode::Or => self.categories.iter().any(|c| book.has_category(c)),
        }
    }

    fn search_matches(&self, book: &BookRecord) -> bool {
        let Some(needle) = self.needle.as_deref() else {
            return true;
        };
        book.title.to_lowercase().contains(needle) || book.author.to_lowercase().contains(needle)
    }
}

/// Visible subset of a collection. Order is preserved.
pub fn filter_collection(
    items: &[CollectionItem],
    selection: &FilterSelection,
) -> Vec<CollectionItem> {
    let filter = CompiledFilter::new(selection);
    items.iter().filter(|item| filter.matches_item(item)).cloned().collect()
}

/// Visible subset of a catalog page. Read and commented flags do not apply to
/// books outside a collection.
pub fn filter_books(books: &[BookRecord], selection: &FilterSelection) -> Vec<BookRecord> {
    if selection.is_empty() {
        return books.to_vec();
    }
    let filter = CompiledFilter::new(selection);
    books.iter().filter(|book| filter.matches_book(book)).cloned().collect()
}

// ─── Ordering ──────────────────────────────────────────────

/// Orderings offered by the catalog views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookOrder {
    /// As returned by the server.
    #[default]
    Server,
    LastAdded,
    BestRated,
    Title,
}

impl FromStr for BookOrder {
    type Err = WonderbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "server" | "default" => Ok(Self::Server),
            "last-added" | "recent" => Ok(Self::LastAdded),
            "best-rated" | "rating" => Ok(Self::BestRated),
            "title" => Ok(Self::Title),
            other => Err(WonderbookError::ValidationError(format!(
                "unknown order: {other} (expected last-added, best-rated or title)"
            ))),
        }
    }
}

/// Stable in-place sort.
pub fn sort_books(books: &mut [BookRecord], order: BookOrder) {
    match order {
        BookOrder::Server => {}
        BookOrder::LastAdded => books.sort_by(|a, b| match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.id.cmp(&a.id),
        }),
        BookOrder::BestRated => books.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating)),
        BookOrder::Title => books.sort_by_key(|b| b.title.to_lowercase()),
    }
}
