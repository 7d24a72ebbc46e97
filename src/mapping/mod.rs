//! Short link to destination URL index
//!
//! The mapping table is a CSV file with a header row and the columns
//! `long_url,domain,hash`. It is loaded fully into memory once and then lent
//! to the aggregator for O(1) joins.

use std::collections::HashMap;
use std::io::Read;

use tracing::debug;

use crate::error::Result;

/// Scheme prefix of every reconstructed short link.
pub const SHORT_LINK_SCHEME: &str = "http://";

/// Build the join key for a short link from its domain and hash.
///
/// Both the mapping load and event lookups go through this function.
pub fn short_link_key(domain: &str, hash: &str) -> String {
    format!("{SHORT_LINK_SCHEME}{domain}/{hash}")
}

/// One short link to destination binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub short_key: String,
    pub destination_url: String,
}

impl MappingEntry {
    /// Build an entry from a `long_url,domain,hash` row.
    ///
    /// Returns `None` for rows with fewer than three fields. Extra fields are
    /// ignored.
    pub fn from_row<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        match fields {
            [long_url, domain, hash, ..] => Some(Self {
                short_key: short_link_key(domain.as_ref(), hash.as_ref()),
                destination_url: long_url.as_ref().to_string(),
            }),
            _ => None,
        }
    }
}

/// In-memory lookup table keyed by reconstructed short link.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    entries: HashMap<String, String>,
    skipped_rows: usize,
}

impl MappingIndex {
    /// Build the index from raw rows, header first.
    ///
    /// The first row is always treated as a header and dropped. Later rows with
    /// too few fields are skipped. When a short link appears more than once the
    /// last row wins.
    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut index = Self::default();

        for (line, row) in rows.into_iter().enumerate().skip(1) {
            let fields = row.as_ref();
            match MappingEntry::from_row(fields) {
                Some(entry) => {
                    index.entries.insert(entry.short_key, entry.destination_url);
                }
                None => {
                    debug!(
                        "Skipping mapping row {} with {} field(s)",
                        line + 1,
                        fields.len()
                    );
                    index.skipped_rows += 1;
                }
            }
        }

        index
    }

    /// Read a whole CSV mapping table and build the index from it.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let records = csv_reader
            .records()
            .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

        Ok(Self::from_rows(
            records.iter().map(|record| record.iter().collect::<Vec<_>>()),
        ))
    }

    /// Look up the destination URL of a short link.
    pub fn lookup(&self, short_link: &str) -> Option<&str> {
        self.entries.get(short_link).map(String::as_str)
    }

    /// Number of distinct short links in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows dropped for having fewer than three fields.
    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}
