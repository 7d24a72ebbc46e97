use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::analytics::{AggregationConfig, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub aggregation: AggregationConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// CSV mapping table (`long_url,domain,hash`)
    pub encodes_path: PathBuf,
    /// JSON array of click events
    pub decodes_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub format: OutputFormat,
    /// How many date buckets to print
    #[serde(default = "ReportConfig::default_date_limit")]
    pub date_limit: usize,
    /// How many unknown short links to print
    #[serde(default = "ReportConfig::default_unknown_limit")]
    pub unknown_limit: usize,
}

impl InputConfig {
    const DEFAULT_ENCODES_PATH: &'static str = "data/encodes.csv";
    const DEFAULT_DECODES_PATH: &'static str = "data/decodes.json";
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            encodes_path: PathBuf::from(Self::DEFAULT_ENCODES_PATH),
            decodes_path: PathBuf::from(Self::DEFAULT_DECODES_PATH),
        }
    }
}

impl ReportConfig {
    const fn default_date_limit() -> usize {
        10
    }

    const fn default_unknown_limit() -> usize {
        5
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            date_limit: Self::default_date_limit(),
            unknown_limit: Self::default_unknown_limit(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = InputConfig::default();
        let encodes_path = lookup("LINKSTATS_ENCODES_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.encodes_path);
        let decodes_path = lookup("LINKSTATS_DECODES_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.decodes_path);

        let filter_year = lookup("FILTER_YEAR")
            .map(|v| v.trim().parse::<i32>())
            .transpose()
            .context("FILTER_YEAR must be an integer year (0 disables filtering)")?
            .unwrap_or(0);

        let sort_order = lookup("SORT_ORDER")
            .unwrap_or_else(|| "desc".to_string())
            .to_lowercase();

        let mut sort_order = match sort_order.as_str() {
            "asc" | "ascending" => SortOrder::Ascending,
            "desc" | "descending" => SortOrder::Descending,
            other => {
                tracing::warn!(
                    "Unknown SORT_ORDER '{other}', falling back to 'desc'. Supported values: asc, desc"
                );
                SortOrder::Descending
            }
        };

        if let Some(descending) = lookup("SORT_DESCENDING") {
            match descending.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => sort_order = SortOrder::from_descending(true),
                "false" | "0" | "no" => sort_order = SortOrder::from_descending(false),
                other => tracing::warn!(
                    "Unknown SORT_DESCENDING '{other}', keeping SORT_ORDER. Supported values: true, false"
                ),
            }
        }

        let format = match lookup("REPORT_FORMAT")
            .unwrap_or_else(|| "text".to_string())
            .to_lowercase()
            .as_str()
        {
            "text" => OutputFormat::Text,
            "json" => OutputFormat::Json,
            other => {
                tracing::warn!(
                    "Unknown REPORT_FORMAT '{other}', falling back to 'text'. Supported values: text, json"
                );
                OutputFormat::Text
            }
        };

        let date_limit = lookup("REPORT_DATE_LIMIT")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("REPORT_DATE_LIMIT must be a non-negative integer")?
            .unwrap_or_else(ReportConfig::default_date_limit);
        let unknown_limit = lookup("REPORT_UNKNOWN_LIMIT")
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("REPORT_UNKNOWN_LIMIT must be a non-negative integer")?
            .unwrap_or_else(ReportConfig::default_unknown_limit);

        let mut aggregation = AggregationConfig::new(filter_year, true);
        aggregation.sort_order = sort_order;

        Ok(Config {
            input: InputConfig {
                encodes_path,
                decodes_path,
            },
            aggregation,
            report: ReportConfig {
                format,
                date_limit,
                unknown_limit,
            },
        })
    }
}
