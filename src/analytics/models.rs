//! Data models for click analytics

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Direction applied to every ranked listing of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    pub fn is_descending(self) -> bool {
        matches!(self, Self::Descending)
    }
}

/// Options that shape a single aggregation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Only count clicks from this year (`None` counts every year)
    pub filter_year: Option<i32>,

    /// Direction of ranked reports
    pub sort_order: SortOrder,
}

impl AggregationConfig {
    /// Build a config from raw option values, where a year of 0 means no filter
    pub fn new(filter_year: i32, sort_descending: bool) -> Self {
        Self {
            filter_year: (filter_year > 0).then_some(filter_year),
            sort_order: SortOrder::from_descending(sort_descending),
        }
    }
}

/// Count map with default-zero lookups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClickCounts(HashMap<String, u64>);

impl ClickCounts {
    pub(crate) fn increment(&mut self, key: &str) {
        match self.0.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.0.insert(key.to_string(), 1);
            }
        }
    }

    /// Count for `key`, zero if it was never seen
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Sum of all counts
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(key, count)| (key.as_str(), *count))
    }
}

/// Running tallies of one pipeline run
///
/// Only the aggregator mutates this; everything else reads it through the
/// accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationState {
    pub(crate) total_clicks: u64,
    pub(crate) processed_records: u64,
    pub(crate) filtered_out: u64,
    pub(crate) clicks_by_destination: ClickCounts,
    pub(crate) clicks_by_referrer: ClickCounts,
    pub(crate) clicks_by_date: ClickCounts,
    pub(crate) unknown_short_links: Vec<String>,
    pub(crate) unresolved: HashSet<String>,
}

impl AggregationState {
    /// Clicks that passed the year filter
    pub fn total_clicks(&self) -> u64 {
        self.total_clicks
    }

    /// Every record handed to the aggregator, filtered or not
    pub fn processed_records(&self) -> u64 {
        self.processed_records
    }

    /// Records dropped by the year filter
    pub fn filtered_out(&self) -> u64 {
        self.filtered_out
    }

    pub fn clicks_by_destination(&self) -> &ClickCounts {
        &self.clicks_by_destination
    }

    pub fn clicks_by_referrer(&self) -> &ClickCounts {
        &self.clicks_by_referrer
    }

    /// Clicks keyed by `YYYY-MM-DD`
    pub fn clicks_by_date(&self) -> &ClickCounts {
        &self.clicks_by_date
    }

    /// Short links with no mapping, in first-seen order, one entry per click
    pub fn unknown_short_links(&self) -> &[String] {
        &self.unknown_short_links
    }

    /// Whether `key` is a short link that failed the mapping lookup
    pub fn is_unresolved(&self, key: &str) -> bool {
        self.unresolved.contains(key)
    }

    pub(crate) fn record_unknown(&mut self, short_link: &str) {
        self.unknown_short_links.push(short_link.to_string());
        if !self.unresolved.contains(short_link) {
            self.unresolved.insert(short_link.to_string());
        }
    }
}
