//! Click analytics module
//!
//! This module holds the single-pass aggregator that folds decoded click
//! events into per-destination, per-referrer and per-day tallies, and the
//! read-only reporting view built on top of its final state.

pub mod aggregator;
pub mod models;
pub mod report;

pub use aggregator::ClickAggregator;
pub use models::{AggregationConfig, AggregationState, ClickCounts, SortOrder};
pub use report::{RankedEntry, Report, ReportView};
