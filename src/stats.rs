// stats.rs - Dashboard statistics derived from the loaded collection.
//
// Always computed over the full, unfiltered collection.

use serde::{Deserialize, Serialize};

use crate::models::GameRecord;

/// Number of entries shown in each "top" chart.
pub const DEFAULT_TOP_N: usize = 5;

/// A generic name → count pair used for chart data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub name:  String,
    pub count: usize,
}

impl CountEntry {
    /// Percentage of `total` this entry represents (bar width).
    pub fn share_of(&self, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            self.count as f64 / total as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub total:              usize,
    pub completed:          usize,
    pub pending:            usize,
    pub completion_percent: u32,
    /// Per-platform counts in first-seen order.
    pub platforms:          Vec<CountEntry>,
    /// Per-genre counts in first-seen order.
    pub genres:             Vec<CountEntry>,
    pub earliest_year:      Option<i32>,
    pub latest_year:        Option<i32>,
}

impl StatisticsSummary {
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn top_platforms(&self, n: usize) -> Vec<CountEntry> {
        top(&self.platforms, n)
    }

    pub fn top_genres(&self, n: usize) -> Vec<CountEntry> {
        top(&self.genres, n)
    }

    pub fn distinct_platforms(&self) -> usize {
        self.platforms.len()
    }

    pub fn distinct_genres(&self) -> usize {
        self.genres.len()
    }
}

/// What the dashboard overlay renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    /// The collection is empty: show the "no statistics yet" panel, not zeros.
    NoStatistics,
    Summary {
        summary:       StatisticsSummary,
        top_platforms: Vec<CountEntry>,
        top_genres:    Vec<CountEntry>,
    },
}

impl DashboardView {
    pub fn from_summary(summary: StatisticsSummary, top_n: usize) -> Self {
        if summary.is_empty() {
            return DashboardView::NoStatistics;
        }
        DashboardView::Summary {
            top_platforms: summary.top_platforms(top_n),
            top_genres: summary.top_genres(top_n),
            summary,
        }
    }
}

pub fn summarize(games: &[GameRecord]) -> StatisticsSummary {
    if games.is_empty() {
        return StatisticsSummary::default();
    }

    let total = games.len();
    let completed = games.iter().filter(|g| g.completed).count();

    let years: Vec<i32> = games.iter().filter_map(|g| g.release_year.as_year()).collect();

    StatisticsSummary {
        total,
        completed,
        pending: total - completed,
        completion_percent: rounded_percent(completed, total),
        platforms: count_by(games.iter().map(|g| g.platform.as_str())),
        genres: count_by(games.iter().map(|g| g.genre.as_str())),
        earliest_year: years.iter().copied().min(),
        latest_year: years.iter().copied().max(),
    }
}

/// round(part / total × 100), halves rounded up. Zero when total is zero.
fn rounded_percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part * 200 + total) / (2 * total)) as u32
}

fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    let mut counts: Vec<CountEntry> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|e| e.name == value) {
            Some(entry) => entry.count += 1,
            None => counts.push(CountEntry { name: value.to_string(), count: 1 }),
        }
    }
    counts
}

// `sort_by` is stable, so equal counts keep first-seen order.
fn top(entries: &[CountEntry], n: usize) -> Vec<CountEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.truncate(n);
    sorted
}
