use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Comment;

pub type BookId = i64;

// ─── BookRecord ─────────────────────────────────────────────

/// A catalog entry as served by the API. The client never edits one in place;
/// updates replace the whole cached copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(rename = "bookId")]
    pub id: BookId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,

    /// Publication date as the server formats it (`2020-05-14`, `2020`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub editors: Vec<Editor>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub cover_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebook_url: Option<String>,

    #[serde(rename = "averageRating", default, deserialize_with = "null_as_default")]
    pub average_rating: f32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl BookRecord {
    pub fn new(id: BookId, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            ..Default::default()
        }
    }

    /// Publication year taken from the first run of four digits in `date`.
    pub fn publication_year(&self) -> Option<u16> {
        self.date.as_deref().and_then(parse_year_from_date_string)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.category_names().any(|c| c == name)
    }

    pub fn has_ebook(&self) -> bool {
        self.ebook_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Reads an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ─── Named references ──────────────────────────────────────

/// The API sends categories and editors either as bare names or as
/// `{ "name": ... }` objects depending on the endpoint.
#[derive(Deserialize)]
#[serde(untagged)]
enum NameOrObject {
    Plain(String),
    Object { name: String },
}

impl NameOrObject {
    fn into_name(self) -> String {
        match self {
            Self::Plain(name) | Self::Object { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Category {
    pub name: String,
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        NameOrObject::deserialize(deserializer).map(|raw| Self {
            name: raw.into_name(),
        })
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// A publisher credited on a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Editor {
    pub name: String,
}

impl<'de> Deserialize<'de> for Editor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        NameOrObject::deserialize(deserializer).map(|raw| Self {
            name: raw.into_name(),
        })
    }
}

/// Opaque reading position (an EPUB CFI produced by the reader library).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingPosition(pub String);

impl ReadingPosition {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReadingPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn parse_year_from_date_string(input: &str) -> Option<u16> {
    input.as_bytes().windows(4).find_map(|w| {
        if w.iter().all(u8::is_ascii_digit) {
            std::str::from_utf8(w).ok()?.parse::<u16>().ok()
        } else {
            None
        }
    })
}
