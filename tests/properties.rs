//! Property tests for the streaming aggregation invariants

use linkstats::analytics::{AggregationConfig, AggregationState, ClickAggregator};
use linkstats::decoder;
use linkstats::mapping::{short_link_key, MappingIndex};
use linkstats::models::ClickEvent;
use proptest::prelude::*;
use std::collections::HashMap;

const LINKS: [&str; 4] = ["mapped1", "mapped2", "orphan1", "orphan2"];
const REFERRERS: [&str; 3] = ["t.co", "direct", "facebook.com"];

fn mapping() -> MappingIndex {
    MappingIndex::from_rows([
        ["long_url", "domain", "hash"],
        ["https://one.example/", "bit.ly", "mapped1"],
        ["https://two.example/", "bit.ly", "mapped2"],
    ])
}

fn event_strategy() -> impl Strategy<Value = ClickEvent> {
    (0..LINKS.len(), 2019..=2021i32, 1..=12u32, 1..=28u32, 0..REFERRERS.len()).prop_map(
        |(link, year, month, day, referrer)| ClickEvent {
            short_link: short_link_key("bit.ly", LINKS[link]),
            user_agent: "proptest".to_string(),
            timestamp: format!("{year:04}-{month:02}-{day:02}T08:15:00Z"),
            referrer: REFERRERS[referrer].to_string(),
            remote_address: "127.0.0.1".to_string(),
        },
    )
}

fn run(events_json: &str, mapping: &MappingIndex, config: &AggregationConfig) -> AggregationState {
    let mut aggregator = ClickAggregator::new(mapping, config.clone());
    decoder::stream(events_json.as_bytes(), |event| {
        aggregator.handle(&event)?;
        Ok(())
    })
    .unwrap();
    aggregator.into_state()
}

proptest! {
    #[test]
    fn prop_replay_is_idempotent(
        events in prop::collection::vec(event_strategy(), 0..60),
        filter_year in prop_oneof![Just(0i32), 2019..=2021i32],
    ) {
        let json = serde_json::to_string(&events).unwrap();
        let index = mapping();
        let config = AggregationConfig::new(filter_year, true);

        let first = run(&json, &index, &config);
        let second = run(&json, &index, &config);

        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_counters_are_consistent(
        events in prop::collection::vec(event_strategy(), 0..60),
        filter_year in prop_oneof![Just(0i32), 2019..=2021i32],
    ) {
        let json = serde_json::to_string(&events).unwrap();
        let index = mapping();
        let state = run(&json, &index, &AggregationConfig::new(filter_year, true));

        prop_assert_eq!(state.processed_records(), events.len() as u64);
        prop_assert_eq!(state.total_clicks(), state.processed_records() - state.filtered_out());
        prop_assert_eq!(state.clicks_by_destination().total(), state.total_clicks());
        prop_assert_eq!(state.clicks_by_referrer().total(), state.total_clicks());
        prop_assert_eq!(state.clicks_by_date().total(), state.total_clicks());

        let expected_unknown: Vec<String> = events
            .iter()
            .filter(|e| filter_year == 0 || e.timestamp.starts_with(&filter_year.to_string()))
            .filter(|e| index.lookup(&e.short_link).is_none())
            .map(|e| e.short_link.clone())
            .collect();
        prop_assert_eq!(state.unknown_short_links(), expected_unknown.as_slice());
    }

    #[test]
    fn prop_lookup_returns_last_written_destination(
        rows in prop::collection::vec(("[a-z]{1,6}\\.[a-z]{2}", "[A-Za-z0-9]{1,7}", "https://[a-z]{1,8}\\.com/"), 0..30),
    ) {
        let mut table = vec![vec!["long_url".to_string(), "domain".to_string(), "hash".to_string()]];
        let mut expected = HashMap::new();
        for (domain, hash, url) in &rows {
            table.push(vec![url.clone(), domain.clone(), hash.clone()]);
            expected.insert(short_link_key(domain, hash), url.clone());
        }

        let index = MappingIndex::from_rows(table);

        prop_assert_eq!(index.len(), expected.len());
        for (key, url) in &expected {
            prop_assert_eq!(index.lookup(key), Some(url.as_str()));
        }
        prop_assert_eq!(index.lookup("http://never.inserted/key"), None);
    }
}
