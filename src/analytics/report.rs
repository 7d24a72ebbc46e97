//! Read-only reporting over a finished aggregation
//!
//! Every ranked listing of a run uses the same sort direction. Empty keys
//! (for example a blank referrer) never appear in ranked listings, though
//! their clicks still count toward the totals.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use crate::analytics::models::{AggregationConfig, AggregationState, ClickCounts, SortOrder};
use crate::config::ReportConfig;

/// One row of a ranked listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: u64,
}

/// Projection over a completed [`AggregationState`]
#[derive(Debug, Clone, Copy)]
pub struct ReportView<'a> {
    state: &'a AggregationState,
    config: &'a AggregationConfig,
}

impl<'a> ReportView<'a> {
    pub fn new(state: &'a AggregationState, config: &'a AggregationConfig) -> Self {
        Self { state, config }
    }

    pub fn state(&self) -> &'a AggregationState {
        self.state
    }

    /// Rank every non-empty key of `counts`
    pub fn ranked_entries(&self, counts: &ClickCounts) -> Vec<RankedEntry> {
        self.ranked_entries_excluding(counts, |_| false)
    }

    /// Rank the non-empty keys of `counts` for which `exclude` is false
    ///
    /// Equal counts are ordered by key so repeated runs print the same listing.
    pub fn ranked_entries_excluding<F>(&self, counts: &ClickCounts, exclude: F) -> Vec<RankedEntry>
    where
        F: Fn(&str) -> bool,
    {
        let mut entries: Vec<RankedEntry> = counts
            .iter()
            .filter(|(key, _)| !key.is_empty() && !exclude(*key))
            .map(|(key, count)| RankedEntry {
                key: key.to_string(),
                count,
            })
            .collect();

        let order = self.config.sort_order;
        entries.sort_by(|a, b| by_count(order, a, b).then_with(|| a.key.cmp(&b.key)));
        entries
    }

    /// True when `key` is a short link that never resolved to a destination
    pub fn is_unresolved(&self, key: &str) -> bool {
        self.state.is_unresolved(key)
    }

    /// Ranked destinations with unresolved short links left out
    pub fn final_summary(&self) -> Vec<RankedEntry> {
        self.ranked_entries_excluding(self.state.clicks_by_destination(), |key| {
            self.is_unresolved(key)
        })
    }

    /// Snapshot everything the printed report needs
    pub fn report(&self, settings: &ReportConfig) -> Report {
        let state = self.state;

        let mut clicks_by_date = self.ranked_entries(state.clicks_by_date());
        clicks_by_date.truncate(settings.date_limit);

        Report {
            filter_year: self.config.filter_year,
            processed_records: state.processed_records(),
            filtered_out: state.filtered_out(),
            total_clicks: state.total_clicks(),
            unknown_short_links: state.unknown_short_links().len(),
            top_destinations: self.ranked_entries(state.clicks_by_destination()),
            top_referrers: self.ranked_entries(state.clicks_by_referrer()),
            clicks_by_date,
            unknown_sample: state
                .unknown_short_links()
                .iter()
                .take(settings.unknown_limit)
                .cloned()
                .collect(),
            final_summary: self.final_summary(),
            processing_time: None,
            date_limit: settings.date_limit,
            unknown_limit: settings.unknown_limit,
        }
    }
}

fn by_count(order: SortOrder, a: &RankedEntry, b: &RankedEntry) -> Ordering {
    if order.is_descending() {
        b.count.cmp(&a.count)
    } else {
        a.count.cmp(&b.count)
    }
}

/// Owned result of a run, printable as text or serializable as JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_year: Option<i32>,
    pub processed_records: u64,
    pub filtered_out: u64,
    pub total_clicks: u64,
    /// Clicks whose short link had no mapping
    pub unknown_short_links: usize,
    pub top_destinations: Vec<RankedEntry>,
    pub top_referrers: Vec<RankedEntry>,
    /// Leading date buckets, in ranked order
    pub clicks_by_date: Vec<RankedEntry>,
    /// Leading unknown short links, in first-seen order
    pub unknown_sample: Vec<String>,
    pub final_summary: Vec<RankedEntry>,
    #[serde(
        rename = "processing_time_ms",
        serialize_with = "serialize_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub processing_time: Option<Duration>,
    /// Configured caps behind the date and unknown link listings
    #[serde(skip)]
    pub date_limit: usize,
    #[serde(skip)]
    pub unknown_limit: usize,
}

impl Report {
    pub fn with_processing_time(mut self, elapsed: Duration) -> Self {
        self.processing_time = Some(elapsed);
        self
    }

    /// Render the final summary as `[{"url": count}, ...]`
    pub fn final_summary_line(&self) -> String {
        let pairs: Vec<String> = self
            .final_summary
            .iter()
            .map(|entry| format!("{{{}: {}}}", json_string(&entry.key), entry.count))
            .collect();
        format!("[{}]", pairs.join(", "))
    }
}

fn json_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn serialize_millis<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(elapsed) => serializer.serialize_f64(elapsed.as_nanos() as f64 / 1_000_000.0),
        None => serializer.serialize_none(),
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Aggregation Results ===")?;
        if let Some(year) = self.filter_year {
            writeln!(f, "Filter Year: {year}")?;
            writeln!(f, "Records Filtered Out: {}", self.filtered_out)?;
        }
        writeln!(f, "Total Records Processed: {}", self.processed_records)?;
        writeln!(f, "Total Clicks: {}", self.total_clicks)?;
        writeln!(f, "Unknown Short Links: {}", self.unknown_short_links)?;
        if let Some(elapsed) = self.processing_time {
            writeln!(f, "Processing Time: {elapsed:?}")?;
        }

        writeln!(f, "\n--- Top Destinations by Clicks ---")?;
        for entry in &self.top_destinations {
            writeln!(f, "{}: {} clicks", entry.key, entry.count)?;
        }

        writeln!(f, "\n--- Top Referrers ---")?;
        for entry in &self.top_referrers {
            writeln!(f, "{}: {} clicks", entry.key, entry.count)?;
        }

        writeln!(f, "\n--- Clicks by Date (first {}) ---", self.date_limit)?;
        for entry in &self.clicks_by_date {
            writeln!(f, "{}: {} clicks", entry.key, entry.count)?;
        }

        if !self.unknown_sample.is_empty() {
            writeln!(
                f,
                "\n--- Unknown Short Link Clicks (first {}) ---",
                self.unknown_limit
            )?;
            for short_link in &self.unknown_sample {
                writeln!(f, "{short_link}")?;
            }
        }

        writeln!(
            f,
            "\nNote: short links without a mapping are excluded from the final summary."
        )?;
        writeln!(f, "\nFinal Summary:")?;
        writeln!(f, "{}", self.final_summary_line())
    }
}
