//! Response sink: a primary channel with a local fallback.

mod backup;
mod sheet;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::{error::PersistenceError, models::ResponseEvent};

pub use backup::BackupFileChannel;
pub use sheet::SheetChannel;

const ENABLE_LOGS: bool = true;

/// Somewhere answers can be appended. A call either stores every event or
/// reports an error.
#[async_trait]
pub trait ResponseChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn append(&self, events: &[ResponseEvent]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RecordOutcome {
    Primary,
    Fallback,
}

#[derive(Clone)]
pub struct ResponseRecorder {
    primary: Option<Arc<dyn ResponseChannel>>,
    fallback: Arc<dyn ResponseChannel>,
}

impl ResponseRecorder {
    pub fn new(
        primary: Option<Arc<dyn ResponseChannel>>,
        fallback: Arc<dyn ResponseChannel>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Records one submission's events. The fallback is tried only when the
    /// primary is missing or fails; the call fails only if both do.
    pub async fn record(&self, events: &[ResponseEvent]) -> Result<RecordOutcome, PersistenceError> {
        if events.is_empty() {
            return Ok(RecordOutcome::Primary);
        }

        match &self.primary {
            Some(primary) => match primary.append(events).await {
                Ok(()) => return Ok(RecordOutcome::Primary),
                Err(err) => {
                    crate::log_warn!(
                        "Primary channel '{}' failed, using {}: {err:#}",
                        primary.name(),
                        self.fallback.name()
                    );
                }
            },
            None => {
                crate::log_warn!(
                    "No primary channel configured; saving to {}",
                    self.fallback.name()
                );
            }
        }

        match self.fallback.append(events).await {
            Ok(()) => Ok(RecordOutcome::Fallback),
            Err(err) => {
                crate::log_error!(
                    "Fallback channel '{}' failed: {err:#}",
                    self.fallback.name()
                );
                Err(PersistenceError(format!("{err:#}")))
            }
        }
    }
}
