use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row, Transaction};

use crate::db::{
    connection::Database,
    helpers::{decode_cells, encode_cells, parse_datetime, to_u64},
    models::SheetRow,
};

fn row_to_sheet_row(row: &Row) -> Result<SheetRow> {
    let row_number: i64 = row.get("row_number")?;
    let cells: String = row.get("cells")?;
    let appended_at: String = row.get("appended_at")?;

    Ok(SheetRow {
        row_number: to_u64(row_number, "row_number")?,
        cells: decode_cells(&cells)?,
        appended_at: parse_datetime(&appended_at, "appended_at")?,
    })
}

/// A sheet counts as headerless when it has no rows or its first row starts
/// with an empty cell.
fn needs_header(tx: &Transaction<'_>) -> Result<bool> {
    let first: Option<String> = tx
        .query_row(
            "SELECT cells FROM sheet_rows ORDER BY row_number ASC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    match first {
        None => Ok(true),
        Some(raw) => {
            let cells = decode_cells(&raw)?;
            Ok(cells.first().map_or(true, |cell| cell.trim().is_empty()))
        }
    }
}

fn insert_row(tx: &Transaction<'_>, cells: &[String], appended_at: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO sheet_rows (cells, appended_at) VALUES (?1, ?2)",
        params![encode_cells(cells)?, appended_at],
    )?;
    Ok(())
}

impl Database {
    /// Appends `rows` in order, writing `header` first when the sheet has
    /// none. Either every row lands or none do.
    pub async fn append_sheet_rows(
        &self,
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open sheet transaction")?;
            let appended_at = Utc::now().to_rfc3339();

            let mut written = 0;
            if needs_header(&tx)? {
                insert_row(&tx, &header, &appended_at)?;
                written += 1;
            }
            for cells in &rows {
                insert_row(&tx, cells, &appended_at)?;
                written += 1;
            }

            tx.commit().context("failed to commit sheet rows")?;
            Ok(written)
        })
        .await
    }

    pub async fn read_sheet_rows(&self) -> Result<Vec<SheetRow>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT row_number, cells, appended_at
                 FROM sheet_rows
                 ORDER BY row_number ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut result = Vec::new();
            while let Some(row) = rows.next()? {
                result.push(row_to_sheet_row(row)?);
            }
            Ok(result)
        })
        .await
    }

    pub async fn sheet_row_count(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM sheet_rows", [], |row| row.get(0))?;
            to_u64(count, "row count")
        })
        .await
    }
}
