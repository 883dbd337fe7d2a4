// filter.rs - Search and filter over the loaded collection.
//
// Everything here is a pure function of (games, criteria). The session calls
// `apply` again after every change to either input.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::GameRecord;

/// Either "everything" or one exact value seen in the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    #[default]
    All,
    Only(String),
}

impl Selector {
    fn admits(&self, value: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => wanted == value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionFilter {
    #[default]
    All,
    Completed,
    Pending,
}

impl CompletionFilter {
    fn admits(self, completed: bool) -> bool {
        match self {
            CompletionFilter::All => true,
            CompletionFilter::Completed => completed,
            CompletionFilter::Pending => !completed,
        }
    }
}

/// Current state of the search bar and the three dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub query:      String,
    pub platform:   Selector,
    pub genre:      Selector,
    pub completion: CompletionFilter,
}

impl FilterCriteria {
    /// True when any control differs from its default (shows the "clear" button).
    pub fn has_active_filters(&self) -> bool {
        !self.query.is_empty()
            || self.platform != Selector::All
            || self.genre != Selector::All
            || self.completion != CompletionFilter::All
    }

    pub fn clear(&mut self) {
        *self = FilterCriteria::default();
    }
}

/// Filter `games`, keeping their order. All predicates must hold.
pub fn apply(games: &[GameRecord], criteria: &FilterCriteria) -> Vec<GameRecord> {
    if games.is_empty() {
        return Vec::new();
    }

    let needle = criteria.query.trim().to_lowercase();

    games
        .iter()
        .filter(|g| {
            needle.is_empty()
                || g.title.to_lowercase().contains(&needle)
                || g.developer.to_lowercase().contains(&needle)
        })
        .filter(|g| criteria.platform.admits(&g.platform))
        .filter(|g| criteria.genre.admits(&g.genre))
        .filter(|g| criteria.completion.admits(g.completed))
        .cloned()
        .collect()
}

/// Distinct platforms in the unfiltered collection, sorted.
pub fn platform_options(games: &[GameRecord]) -> Vec<String> {
    distinct(games.iter().map(|g| g.platform.as_str()))
}

/// Distinct genres in the unfiltered collection, sorted.
pub fn genre_options(games: &[GameRecord]) -> Vec<String> {
    distinct(games.iter().map(|g| g.genre.as_str()))
}

// RUST NOTE: a BTreeSet keeps its elements sorted and unique, which is
// exactly what a dropdown wants.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
