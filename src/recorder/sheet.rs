use anyhow::Result;
use async_trait::async_trait;

use super::ResponseChannel;
use crate::{
    db::Database,
    models::{header_row, ResponseEvent},
};

/// Primary channel: the append-only response sheet.
pub struct SheetChannel {
    db: Database,
}

impl SheetChannel {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ResponseChannel for SheetChannel {
    fn name(&self) -> &'static str {
        "sheet"
    }

    async fn append(&self, events: &[ResponseEvent]) -> Result<()> {
        let rows = events.iter().map(ResponseEvent::to_row).collect();
        self.db.append_sheet_rows(header_row(), rows).await?;
        Ok(())
    }
}
