use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use super::ResponseChannel;
use crate::models::ResponseEvent;

/// Fallback channel: one JSON object per line, appended to a local file.
pub struct BackupFileChannel {
    path: PathBuf,
}

impl BackupFileChannel {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResponseChannel for BackupFileChannel {
    fn name(&self) -> &'static str {
        "backup file"
    }

    async fn append(&self, events: &[ResponseEvent]) -> Result<()> {
        // Serialize everything first so a bad event writes nothing.
        let mut buffer = String::new();
        for event in events {
            buffer.push_str(&serde_json::to_string(event).context("failed to encode response")?);
            buffer.push('\n');
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(buffer.as_bytes())
            .await
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::tests::sample_event;
    use tempfile::tempdir;

    #[tokio::test]
    async fn appends_one_line_per_event() {
        let dir = tempdir().unwrap();
        let channel = BackupFileChannel::new(dir.path().join("nested/backup.jsonl"));

        channel.append(&[sample_event("q1")]).await.unwrap();
        channel
            .append(&[sample_event("q2"), sample_event("q3")])
            .await
            .unwrap();

        let raw = std::fs::read_to_string(channel.path()).unwrap();
        let lines: Vec<ResponseEvent> = raw
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].question_text, "q3");
    }
}
