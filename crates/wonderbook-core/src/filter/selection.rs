use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WonderbookError;
use crate::filter::YearFilter;

/// Selecting more categories than this is refused by [`FilterSelection::toggled_category`].
pub const MAX_SELECTED_CATEGORIES: usize = 2;

// ─── CombinationMode ───────────────────────────────────────

/// How several selected categories combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombinationMode {
    /// `et`: a book needs every selected category.
    #[default]
    #[serde(rename = "et")]
    And,
    /// `ou`: one selected category is enough.
    #[serde(rename = "ou")]
    Or,
}

impl CombinationMode {
    /// Query-string value understood by the API.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::And => "et",
            Self::Or => "ou",
        }
    }
}

impl std::fmt::Display for CombinationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for CombinationMode {
    type Err = WonderbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "et" | "and" => Ok(Self::And),
            "ou" | "or" => Ok(Self::Or),
            other => Err(WonderbookError::ValidationError(format!(
                "unknown combination mode: {other} (expected et or ou)"
            ))),
        }
    }
}

// ─── ReadFilter ────────────────────────────────────────────

/// Read-status filter of the collection view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    All,
    Read,
    Unread,
}

impl ReadFilter {
    pub fn matches(self, is_read: bool) -> bool {
        match self {
            Self::All => true,
            Self::Read => is_read,
            Self::Unread => !is_read,
        }
    }

    /// Value for the server-side `is_read` prefilter, `None` for no constraint.
    pub fn as_query_flag(self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Read => Some(true),
            Self::Unread => Some(false),
        }
    }
}

impl std::fmt::Display for ReadFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::All => "all",
            Self::Read => "read",
            Self::Unread => "unread",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReadFilter {
    type Err = WonderbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "read" => Ok(Self::Read),
            "unread" => Ok(Self::Unread),
            other => Err(WonderbookError::ValidationError(format!(
                "unknown read filter: {other} (expected all, read or unread)"
            ))),
        }
    }
}

// ─── FilterSelection ───────────────────────────────────────

/// The active filter selection. Replaced wholesale on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    /// Selected category names, in selection order.
    #[serde(default)]
    pub categories: Vec<String>,

    /// Committed year filter. Drafts being typed live in [`crate::filter::YearInput`].
    #[serde(default)]
    pub year: YearFilter,

    #[serde(default)]
    pub mode: CombinationMode,

    #[serde(default)]
    pub search: String,

    #[serde(default)]
    pub read: ReadFilter,

    /// Keep only collection items the owner commented on.
    #[serde(default)]
    pub commented: bool,
}

impl FilterSelection {
    pub fn with_mode(mode: CombinationMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Category set after toggling `name`: removed if present, added if there
    /// is room, unchanged otherwise.
    pub fn toggled_category(&self, name: &str) -> Vec<String> {
        let mut next = self.categories.clone();
        if let Some(pos) = next.iter().position(|c| c == name) {
            next.remove(pos);
        } else if next.len() < MAX_SELECTED_CATEGORIES {
            next.push(name.to_string());
        }
        next
    }

    /// Trimmed, lowercased search text; `None` when the search box is blank.
    pub fn search_needle(&self) -> Option<String> {
        let trimmed = self.search.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }

    /// True when no predicate would exclude anything.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && !self.year.is_active()
            && self.search_needle().is_none()
            && self.read == ReadFilter::All
            && !self.commented
    }
}
