//! End-to-end run: build the mapping index, stream the click events through
//! the aggregator, and hand back the terminal state for reporting.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::analytics::{AggregationConfig, AggregationState, ClickAggregator, Report, ReportView};
use crate::config::{InputConfig, ReportConfig};
use crate::decoder;
use crate::error::Result;
use crate::mapping::MappingIndex;

/// Terminal state of a completed run
#[derive(Debug, Clone)]
pub struct Analysis {
    pub state: AggregationState,
    pub config: AggregationConfig,
    /// Distinct short links in the mapping index
    pub mapping_entries: usize,
    /// Time spent streaming and aggregating
    pub elapsed: Duration,
}

impl Analysis {
    pub fn view(&self) -> ReportView<'_> {
        ReportView::new(&self.state, &self.config)
    }

    pub fn report(&self, settings: &ReportConfig) -> Report {
        self.view()
            .report(settings)
            .with_processing_time(self.elapsed)
    }
}

/// Load the CSV mapping table at `path`
pub fn load_mapping(path: &Path) -> Result<MappingIndex> {
    let file = File::open(path)?;
    let index = MappingIndex::from_reader(file)?;

    info!(
        "Loaded {} short link mapping(s) from {}",
        index.len(),
        path.display()
    );
    if index.skipped_rows() > 0 {
        warn!(
            "Skipped {} mapping row(s) with fewer than 3 fields",
            index.skipped_rows()
        );
    }

    Ok(index)
}

/// Stream the event file at `path` through a fresh aggregator
///
/// On failure nothing is returned: a run either covers the whole input or
/// reports why it stopped.
pub fn aggregate_events(
    path: &Path,
    mapping: &MappingIndex,
    config: &AggregationConfig,
) -> Result<(AggregationState, Duration)> {
    let file = File::open(path)?;
    let started = Instant::now();

    let mut aggregator = ClickAggregator::new(mapping, config.clone());
    let delivered = decoder::stream(file, |event| {
        aggregator.handle(&event)?;
        Ok(())
    })?;

    let elapsed = started.elapsed();
    info!(
        "Aggregated {} click event(s) from {} in {:?}",
        delivered,
        path.display(),
        elapsed
    );

    Ok((aggregator.into_state(), elapsed))
}

/// Run the whole pipeline over the configured input files
pub fn run(input: &InputConfig, config: &AggregationConfig) -> Result<Analysis> {
    let mapping = load_mapping(&input.encodes_path)?;
    let (state, elapsed) = aggregate_events(&input.decodes_path, &mapping, config)?;

    Ok(Analysis {
        state,
        config: config.clone(),
        mapping_entries: mapping.len(),
        elapsed,
    })
}
