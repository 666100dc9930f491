use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Sheet cells are stored as a JSON array of strings.
pub fn encode_cells(cells: &[String]) -> Result<String> {
    serde_json::to_string(cells).context("failed to encode sheet cells")
}

pub fn decode_cells(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).context("failed to decode sheet cells")
}
