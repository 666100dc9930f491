use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored row of the response sheet. Row 1 holds the column header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub row_number: u64,
    pub cells: Vec<String>,
    pub appended_at: DateTime<Utc>,
}

impl SheetRow {
    pub fn first_cell(&self) -> Option<&str> {
        self.cells.first().map(String::as_str)
    }
}
