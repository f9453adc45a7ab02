//! File channel: appends one JSON line per alert.
//!
//! Each line is `{"rule_name": .., "received_at": .., "results": [..]}`.

use std::path::{Path, PathBuf};

use stupid_core::Record;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::traits::{AlertPayload, Channel, NotifyError};

#[derive(Debug)]
pub struct FileChannel {
    path: PathBuf,
    /// Serializes appends so concurrent alerts never interleave lines.
    write_lock: Mutex<()>,
}

impl FileChannel {
    /// Create a channel appending to `path`. A leading `~/` is expanded from
    /// `$HOME`.
    pub fn new(path: &str) -> Result<Self, NotifyError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(NotifyError::Config("no file path provided".to_string()));
        }
        Ok(Self {
            path: expand_home(trimmed)?,
            write_lock: Mutex::new(()),
        })
    }
}

fn expand_home(path: &str) -> Result<PathBuf, NotifyError> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").map_err(|_| {
                NotifyError::Config(format!("cannot expand '{path}': HOME is not set"))
            })?;
            Ok(Path::new(&home).join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

#[async_trait::async_trait]
impl Channel for FileChannel {
    async fn deliver(&self, rule_name: &str, records: &[Record]) -> Result<(), NotifyError> {
        let mut line = serde_json::to_vec(&AlertPayload::new(rule_name, records))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(channel = "file", path = %self.path.display(), rule = %rule_name, "alert appended");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "file"
    }
}
