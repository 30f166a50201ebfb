use chrono::Datelike;
use serde::{Deserialize, Serialize};

// ─── YearFilter ────────────────────────────────────────────

/// Committed year constraint consumed by the filter engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YearFilter {
    #[default]
    Unset,
    Year(u16),
    /// Inclusive bounds. A reversed range constrains nothing.
    Range(u16, u16),
}

impl YearFilter {
    /// Parses `"2020"` or `"2018-2022"`. Anything else is `Unset`.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.split_once('-') {
            Some((start, end)) => {
                match (four_digit_year(start.trim()), four_digit_year(end.trim())) {
                    (Some(s), Some(e)) => Self::Range(s, e),
                    _ => Self::Unset,
                }
            }
            None => four_digit_year(input).map_or(Self::Unset, Self::Year),
        }
    }

    pub fn is_active(self) -> bool {
        match self {
            Self::Unset => false,
            Self::Year(_) => true,
            Self::Range(start, end) => start <= end,
        }
    }

    /// Does a book published in `year` pass? Books without a year only pass
    /// an inactive filter.
    pub fn matches(self, year: Option<u16>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(year) = year else {
            return false;
        };
        match self {
            Self::Year(y) => year == y,
            Self::Range(start, end) => (start..=end).contains(&year),
            Self::Unset => true,
        }
    }
}

impl std::fmt::Display for YearFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => Ok(()),
            Self::Year(y) => write!(f, "{y}"),
            Self::Range(start, end) => write!(f, "{start}-{end}"),
        }
    }
}

fn four_digit_year(s: &str) -> Option<u16> {
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

// ─── YearInput ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearMode {
    /// One exact year.
    #[default]
    Unique,
    /// A start/end range.
    Tranche,
}

/// Raw text currently typed in the year fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearDraft {
    Single(String),
    Range { start: String, end: String },
}

impl Default for YearDraft {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

/// Accepted span for range bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearBounds {
    pub min: u16,
    pub max: u16,
}

impl YearBounds {
    /// `min` up to the current calendar year.
    pub fn up_to_current(min: u16) -> Self {
        let max = u16::try_from(chrono::Local::now().year()).unwrap_or(u16::MAX);
        Self { min, max }
    }
}

/// Year field editor. Keeps the draft the user sees separate from the
/// committed [`YearFilter`] the engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearInput {
    draft: YearDraft,
    bounds: YearBounds,
}

impl YearInput {
    pub fn new(bounds: YearBounds) -> Self {
        Self {
            draft: YearDraft::default(),
            bounds,
        }
    }

    pub fn mode(&self) -> YearMode {
        match self.draft {
            YearDraft::Single(_) => YearMode::Unique,
            YearDraft::Range { .. } => YearMode::Tranche,
        }
    }

    pub fn draft(&self) -> &YearDraft {
        &self.draft
    }

    pub fn bounds(&self) -> YearBounds {
        self.bounds
    }

    /// Switching mode clears whatever was typed.
    pub fn set_mode(&mut self, mode: YearMode) -> YearFilter {
        if mode != self.mode() {
            self.draft = match mode {
                YearMode::Unique => YearDraft::Single(String::new()),
                YearMode::Tranche => YearDraft::Range {
                    start: String::new(),
                    end: String::new(),
                },
            };
        }
        self.committed()
    }

    /// Keystroke in the single-year field. Ignored in range mode.
    pub fn type_year(&mut self, raw: &str) -> YearFilter {
        if let YearDraft::Single(value) = &mut self.draft {
            *value = sanitize(raw);
        }
        self.committed()
    }

    /// Keystroke in the range start field. Ignored in single-year mode.
    pub fn type_start(&mut self, raw: &str) -> YearFilter {
        if let YearDraft::Range { start, .. } = &mut self.draft {
            *start = sanitize(raw);
        }
        self.committed()
    }

    /// Keystroke in the range end field. Ignored in single-year mode.
    pub fn type_end(&mut self, raw: &str) -> YearFilter {
        if let YearDraft::Range { end, .. } = &mut self.draft {
            *end = sanitize(raw);
        }
        self.committed()
    }

    /// Mirrors an externally set filter into the draft.
    pub fn load(&mut self, filter: YearFilter) {
        self.draft = match filter {
            YearFilter::Unset => match self.mode() {
                YearMode::Unique => YearDraft::Single(String::new()),
                YearMode::Tranche => YearDraft::Range {
                    start: String::new(),
                    end: String::new(),
                },
            },
            YearFilter::Year(y) => YearDraft::Single(y.to_string()),
            YearFilter::Range(start, end) => YearDraft::Range {
                start: start.to_string(),
                end: end.to_string(),
            },
        };
    }

    pub fn clear(&mut self) {
        self.draft = YearDraft::default();
    }

    /// The filter the current draft commits to.
    pub fn committed(&self) -> YearFilter {
        match &self.draft {
            YearDraft::Single(value) => {
                four_digit_year(value).map_or(YearFilter::Unset, YearFilter::Year)
            }
            YearDraft::Range { start, end } => {
                let (Some(s), Some(e)) = (four_digit_year(start), four_digit_year(end)) else {
                    return YearFilter::Unset;
                };
                let bounds = self.bounds;
                if bounds.min <= s && s <= e && e <= bounds.max {
                    YearFilter::Range(s, e)
                } else {
                    YearFilter::Unset
                }
            }
        }
    }
}

/// Digits only, at most four of them.
fn sanitize(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).take(4).collect()
}
