use tokio::sync::watch;
use tracing::debug;

use crate::filter::{
    CombinationMode, FilterSelection, ReadFilter, YearBounds, YearFilter, YearInput, YearMode,
};

/// Every way the filter selection can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Replace the category set as given.
    SetCategories(Vec<String>),
    /// Remove if selected, add if there is room, otherwise nothing.
    ToggleCategory(String),
    /// Replace the committed year and mirror it into the year fields.
    SetYear(YearFilter),
    SetYearMode(YearMode),
    TypeYear(String),
    TypeRangeStart(String),
    TypeRangeEnd(String),
    SetMode(CombinationMode),
    SetSearch(String),
    SetReadFilter(ReadFilter),
    SetCommented(bool),
    /// Back to the selection the store was created with.
    Reset,
}

/// Selection plus the year editor feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub selection: FilterSelection,
    pub year_input: YearInput,
    initial: FilterSelection,
}

impl FilterState {
    pub fn new(initial: FilterSelection, bounds: YearBounds) -> Self {
        let mut year_input = YearInput::new(bounds);
        year_input.load(initial.year);
        Self {
            selection: initial.clone(),
            year_input,
            initial,
        }
    }

    /// Reducer: applies one action in place. Total; never fails.
    pub fn apply(&mut self, action: FilterAction) {
        match action {
            FilterAction::SetCategories(categories) => self.selection.categories = categories,
            FilterAction::ToggleCategory(name) => {
                self.selection.categories = self.selection.toggled_category(&name);
            }
            FilterAction::SetYear(year) => {
                self.year_input.load(year);
                self.selection.year = year;
            }
            FilterAction::SetYearMode(mode) => self.selection.year = self.year_input.set_mode(mode),
            FilterAction::TypeYear(raw) => self.selection.year = self.year_input.type_year(&raw),
            FilterAction::TypeRangeStart(raw) => {
                self.selection.year = self.year_input.type_start(&raw);
            }
            FilterAction::TypeRangeEnd(raw) => self.selection.year = self.year_input.type_end(&raw),
            FilterAction::SetMode(mode) => self.selection.mode = mode,
            FilterAction::SetSearch(search) => self.selection.search = search,
            FilterAction::SetReadFilter(read) => self.selection.read = read,
            FilterAction::SetCommented(commented) => self.selection.commented = commented,
            FilterAction::Reset => {
                self.selection = self.initial.clone();
                self.year_input.clear();
                self.year_input.load(self.initial.year);
            }
        }
    }
}

/// Session-wide owner of the filter selection.
///
/// Views subscribe through [`FilterStore::subscribe`]; they are woken once per
/// dispatch (or batch) and only when the selection actually changed.
pub struct FilterStore {
    state: FilterState,
    tx: watch::Sender<FilterSelection>,
}

impl FilterStore {
    pub fn new(initial: FilterSelection, bounds: YearBounds) -> Self {
        let (tx, _rx) = watch::channel(initial.clone());
        Self {
            state: FilterState::new(initial, bounds),
            tx,
        }
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.state.selection
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterSelection> {
        self.tx.subscribe()
    }

    pub fn dispatch(&mut self, action: FilterAction) {
        debug!(?action, "filter dispatch");
        self.state.apply(action);
        self.publish();
    }

    /// Applies all actions, then notifies once with the combined result.
    pub fn dispatch_batch(&mut self, actions: impl IntoIterator<Item = FilterAction>) {
        for action in actions {
            debug!(?action, "filter dispatch (batched)");
            self.state.apply(action);
        }
        self.publish();
    }

    fn publish(&self) {
        let next = &self.state.selection;
        self.tx.send_if_modified(|current| {
            if current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new(FilterSelection::default(), YearBounds::up_to_current(1000))
    }
}
