//! Single-pass click aggregator
//!
//! The aggregator is fed one decoded event at a time and never keeps the event
//! itself. Per event it joins the short link against the mapping index,
//! applies the optional year filter and bumps the destination, referrer and
//! date tallies.
//!
//! A click whose short link has no mapping still counts: it is bucketed under
//! the short link string and remembered in the unknown list. A timestamp that
//! does not parse is fatal and is returned to the caller.

use chrono::Datelike;
use tracing::trace;

use crate::analytics::models::{AggregationConfig, AggregationState};
use crate::analytics::report::ReportView;
use crate::error::TimestampError;
use crate::mapping::MappingIndex;
use crate::models::{parse_timestamp, ClickEvent};

/// Stateful per-event processor for one pipeline run
pub struct ClickAggregator<'a> {
    /// Read-only mapping built before streaming starts
    mapping: &'a MappingIndex,
    config: AggregationConfig,
    state: AggregationState,
}

impl<'a> ClickAggregator<'a> {
    /// Create an aggregator with empty state
    pub fn new(mapping: &'a MappingIndex, config: AggregationConfig) -> Self {
        Self {
            mapping,
            config,
            state: AggregationState::default(),
        }
    }

    /// Fold one click event into the running tallies
    ///
    /// The record is counted as processed before anything else happens, so a
    /// failing record still shows up in `processed_records`.
    pub fn handle(&mut self, event: &ClickEvent) -> Result<(), TimestampError> {
        self.state.processed_records += 1;

        let clicked_at = parse_timestamp(&event.timestamp)?;

        if let Some(year) = self.config.filter_year {
            if clicked_at.year() != year {
                self.state.filtered_out += 1;
                return Ok(());
            }
        }

        self.state.total_clicks += 1;

        let mapping = self.mapping;
        let destination = match mapping.lookup(&event.short_link) {
            Some(destination) => destination,
            None => {
                trace!("No mapping for short link {}", event.short_link);
                self.state.record_unknown(&event.short_link);
                event.short_link.as_str()
            }
        };

        self.state.clicks_by_destination.increment(destination);
        self.state.clicks_by_referrer.increment(&event.referrer);
        self.state
            .clicks_by_date
            .increment(&clicked_at.date().to_string());

        Ok(())
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Read-only reporting view over the current state
    pub fn view(&self) -> ReportView<'_> {
        ReportView::new(&self.state, &self.config)
    }

    /// Finish the run and hand back the terminal state
    pub fn into_state(self) -> AggregationState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(entries: &[(&str, &str, &str)]) -> MappingIndex {
        let mut rows = vec![vec!["long_url", "domain", "hash"]];
        rows.extend(entries.iter().map(|(url, domain, hash)| vec![*url, *domain, *hash]));
        MappingIndex::from_rows(rows)
    }

    fn click(short_link: &str, timestamp: &str, referrer: &str) -> ClickEvent {
        ClickEvent {
            short_link: short_link.to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timestamp: timestamp.to_string(),
            referrer: referrer.to_string(),
            remote_address: "1.1.1.1".to_string(),
        }
    }

    #[test]
    fn test_new_aggregator_is_empty() {
        let index = mapping(&[("https://example.com/", "bit.ly", "test")]);
        let aggregator = ClickAggregator::new(&index, AggregationConfig::default());

        assert_eq!(aggregator.state().total_clicks(), 0);
        assert_eq!(aggregator.state().processed_records(), 0);
        assert!(aggregator.state().clicks_by_destination().is_empty());
    }

    #[test]
    fn test_handle_known_short_link() {
        let index = mapping(&[
            ("https://google.com/", "bit.ly", "31Tt55y"),
            ("https://github.com/", "bit.ly", "2kJO0qS"),
        ]);
        let mut aggregator = ClickAggregator::new(&index, AggregationConfig::default());

        aggregator
            .handle(&click("http://bit.ly/31Tt55y", "2020-02-15T00:00:00Z", "t.co"))
            .unwrap();

        let state = aggregator.state();
        assert_eq!(state.total_clicks(), 1);
        assert_eq!(state.processed_records(), 1);
        assert_eq!(state.clicks_by_destination().get("https://google.com/"), 1);
        assert_eq!(state.clicks_by_referrer().get("t.co"), 1);
        assert_eq!(state.clicks_by_date().get("2020-02-15"), 1);
        assert!(state.unknown_short_links().is_empty());
    }

    #[test]
    fn test_handle_unknown_short_link_falls_back() {
        let index = mapping(&[("https://known.com/", "bit.ly", "known")]);
        let mut aggregator = ClickAggregator::new(&index, AggregationConfig::default());

        aggregator
            .handle(&click("http://bit.ly/unknown", "2020-02-15T00:00:00Z", "direct"))
            .unwrap();

        let state = aggregator.state();
        assert_eq!(state.total_clicks(), 1);
        assert_eq!(state.unknown_short_links(), ["http://bit.ly/unknown"]);
        assert_eq!(state.clicks_by_destination().get("http://bit.ly/unknown"), 1);
        assert!(state.is_unresolved("http://bit.ly/unknown"));
    }

    #[test]
    fn test_handle_invalid_timestamp() {
        let index = mapping(&[("https://test.com/", "bit.ly", "test")]);
        let mut aggregator = ClickAggregator::new(&index, AggregationConfig::default());

        let err = aggregator
            .handle(&click("http://bit.ly/test", "invalid-timestamp", "direct"))
            .unwrap_err();

        assert_eq!(err.value, "invalid-timestamp");
        let state = aggregator.state();
        assert_eq!(state.processed_records(), 1);
        assert_eq!(state.total_clicks(), 0);
        assert_eq!(state.filtered_out(), 0);
        assert!(state.clicks_by_destination().is_empty());
    }

    #[test]
    fn test_handle_multiple_records() {
        let index = mapping(&[
            ("https://google.com/", "bit.ly", "google"),
            ("https://github.com/", "bit.ly", "github"),
        ]);
        let mut aggregator = ClickAggregator::new(&index, AggregationConfig::default());

        for event in [
            click("http://bit.ly/google", "2020-01-01T00:00:00Z", "direct"),
            click("http://bit.ly/google", "2020-01-01T00:00:00Z", "t.co"),
            click("http://bit.ly/github", "2020-01-02T00:00:00Z", "direct"),
        ] {
            aggregator.handle(&event).unwrap();
        }

        let state = aggregator.state();
        assert_eq!(state.total_clicks(), 3);
        assert_eq!(state.clicks_by_destination().get("https://google.com/"), 2);
        assert_eq!(state.clicks_by_destination().get("https://github.com/"), 1);
        assert_eq!(state.clicks_by_referrer().get("direct"), 2);
        assert_eq!(state.clicks_by_date().get("2020-01-01"), 2);
        assert_eq!(state.clicks_by_date().get("2020-01-02"), 1);
    }

    #[test]
    fn test_year_filter() {
        let index = mapping(&[
            ("https://a.com/", "bit.ly", "a"),
            ("https://b.com/", "bit.ly", "b"),
        ]);
        let mut aggregator = ClickAggregator::new(&index, AggregationConfig::new(2020, true));
        assert_eq!(aggregator.config().filter_year, Some(2020));

        for event in [
            click("http://bit.ly/a", "2020-03-01T10:00:00Z", "direct"),
            click("http://bit.ly/a", "2020-07-04T10:00:00Z", "t.co"),
            click("http://bit.ly/b", "2021-01-01T00:00:00Z", "facebook.com"),
        ] {
            aggregator.handle(&event).unwrap();
        }

        let state = aggregator.state();
        assert_eq!(state.processed_records(), 3);
        assert_eq!(state.total_clicks(), 2);
        assert_eq!(state.filtered_out(), 1);
        assert_eq!(state.clicks_by_destination().get("https://b.com/"), 0);
        assert_eq!(state.clicks_by_referrer().get("facebook.com"), 0);
        assert_eq!(state.clicks_by_date().get("2021-01-01"), 0);
    }

    #[test]
    fn test_filtered_unknown_link_is_not_tracked() {
        let index = MappingIndex::default();
        let mut aggregator = ClickAggregator::new(&index, AggregationConfig::new(2020, true));

        aggregator
            .handle(&click("http://bit.ly/zzz", "2019-05-05T05:05:05Z", "direct"))
            .unwrap();

        assert!(aggregator.state().unknown_short_links().is_empty());
        assert_eq!(aggregator.state().filtered_out(), 1);
    }

    #[test]
    fn test_tallies_stay_consistent() {
        let index = mapping(&[("https://a.com/", "bit.ly", "a")]);
        let mut aggregator = ClickAggregator::new(&index, AggregationConfig::default());

        for (i, link) in ["a", "x", "a", "y", "x"].iter().enumerate() {
            let timestamp = format!("2020-02-1{}T00:00:00Z", i);
            aggregator
                .handle(&click(&format!("http://bit.ly/{link}"), &timestamp, "ref"))
                .unwrap();
        }

        let state = aggregator.into_state();
        assert_eq!(state.total_clicks(), 5);
        assert_eq!(state.clicks_by_destination().total(), 5);
        assert_eq!(state.clicks_by_referrer().total(), 5);
        assert_eq!(state.clicks_by_date().total(), 5);
        assert_eq!(
            state.unknown_short_links(),
            ["http://bit.ly/x", "http://bit.ly/y", "http://bit.ly/x"]
        );
    }
}
