use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::TimestampError;

/// Layout every click timestamp must follow (UTC, seconds precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Byte shape of [`TIMESTAMP_FORMAT`]; `d` stands for an ASCII digit.
const TIMESTAMP_SHAPE: &[u8; 20] = b"dddd-dd-ddTdd:dd:ddZ";

/// One click on a short link, as decoded from the event array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    #[serde(rename = "bitlink", default, deserialize_with = "null_as_empty")]
    pub short_link: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user_agent: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub referrer: String,
    #[serde(rename = "remote_ip", default, deserialize_with = "null_as_empty")]
    pub remote_address: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a click timestamp in the strict `YYYY-MM-DDTHH:MM:SSZ` form.
///
/// Fractional seconds, numeric offsets, date-only values and unpadded fields
/// are all rejected, as are leap seconds.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, TimestampError> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == TIMESTAMP_SHAPE.len()
        && bytes
            .iter()
            .zip(TIMESTAMP_SHAPE)
            .all(|(&b, &s)| if s == b'd' { b.is_ascii_digit() } else { b == s });
    if !shaped {
        return Err(TimestampError::new(value));
    }

    let parsed = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|_| TimestampError::new(value))?;

    // chrono folds second 60 into the nanosecond field
    if parsed.nanosecond() >= 1_000_000_000 {
        return Err(TimestampError::new(value));
    }

    Ok(parsed)
}
