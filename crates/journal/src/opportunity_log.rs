//! Bounded opportunity log persisted as a JSON array.

use crate::error::io_error;
use crate::{JournalError, JournalResult};
use std::path::{Path, PathBuf};
use tickarb_core::EvaluatedOpportunity;
use tokio::sync::Mutex;
use tracing::debug;

/// Number of opportunities kept on disk.
pub const MAX_OPPORTUNITIES: usize = 100;

/// The most recent evaluated opportunities, oldest first.
///
/// Every append rewrites the whole file through a temporary file and a
/// rename, so a reader sees either the previous list or the new one.
pub struct OpportunityLog {
    path: PathBuf,
    capacity: usize,
    write_lock: Mutex<()>,
}

impl OpportunityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, MAX_OPPORTUNITIES)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole log. A missing file is an empty log.
    pub async fn read_all(&self) -> JournalResult<Vec<EvaluatedOpportunity>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.path)(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| JournalError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Append `entry`, dropping the oldest entries beyond capacity.
    pub async fn append(&self, entry: &EvaluatedOpportunity) -> JournalResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.read_all().await?;
        entries.push(entry.clone());
        if entries.len() > self.capacity {
            let excess = entries.len() - self.capacity;
            entries.drain(..excess);
        }

        let encoded = serde_json::to_vec_pretty(&entries)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, encoded).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(io_error(&self.path))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Opportunity logged");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
