//! Shared engine state handed to the control surface.
//!
//! The engine is the only writer of [`BotStatus`]. Every write from the run
//! loop carries the run's generation; writes from a loop that has been
//! superseded by a newer start are dropped.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tickarb_core::{BotConfig, BotStatus, ConfigError, ConfigPatch};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct StatusState {
    status: BotStatus,
    generation: u64,
}

/// Shared, cloneable handle to the engine's run status.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<StatusState>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> BotStatus {
        self.inner.read().await.status.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.read().await.status.running
    }

    /// Reset the status for a new run and return the run's generation.
    pub(crate) async fn begin_run(&self, now: DateTime<Utc>) -> u64 {
        let mut state = self.inner.write().await;
        state.generation += 1;
        state.status = BotStatus::started(now);
        state.generation
    }

    /// Apply `f` if `generation` is still the current run. Returns whether it was applied.
    pub(crate) async fn update<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut BotStatus),
    {
        let mut state = self.inner.write().await;
        if state.generation != generation {
            return false;
        }
        f(&mut state.status);
        true
    }

    /// Freeze the current run. A stopped status is left as is.
    pub(crate) async fn mark_stopped(&self) {
        self.inner.write().await.status.running = false;
    }

    /// Freeze the status when the loop of `generation` exits.
    pub(crate) async fn finish_run(&self, generation: u64) {
        self.update(generation, |status| status.running = false).await;
    }
}

/// Shared, cloneable handle to the runtime settings.
///
/// Readers take a full snapshot; writers merge a patch atomically.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<BotConfig>>,
}

impl ConfigHandle {
    pub fn new(config: BotConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub async fn snapshot(&self) -> BotConfig {
        self.inner.read().await.clone()
    }

    /// Merge `patch` into the current settings. On validation failure the
    /// settings are unchanged.
    pub async fn merge(&self, patch: ConfigPatch) -> Result<BotConfig, ConfigError> {
        let mut config = self.inner.write().await;
        let merged = config.merged(patch)?;
        *config = merged.clone();
        Ok(merged)
    }
}
