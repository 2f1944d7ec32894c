//! Bot run status exposed to the control surface.

use crate::EvaluatedOpportunity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of errors kept in [`BotStatus::errors`]; older ones roll off.
pub const MAX_STATUS_ERRORS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

/// Snapshot of the engine's run state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotStatus {
    pub running: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub total_trades: u64,
    pub total_profit: f64,
    pub last_opportunity: Option<EvaluatedOpportunity>,
    pub errors: Vec<ErrorEntry>,
    /// Transient failures (fetches, fee lookups, order books) during this run.
    pub warnings: u64,
    /// Completed ticks during this run.
    pub ticks: u64,
}

impl BotStatus {
    /// Fresh status for a run starting now.
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            running: true,
            start_time: Some(now),
            ..Self::default()
        }
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(ErrorEntry {
            timestamp: Utc::now(),
            error: error.into(),
        });
        if self.errors.len() > MAX_STATUS_ERRORS {
            let excess = self.errors.len() - MAX_STATUS_ERRORS;
            self.errors.drain(..excess);
        }
    }

    pub fn record_trade(&mut self, profit: f64) {
        self.total_trades += 1;
        self.total_profit += profit;
    }

    pub fn uptime_secs(&self, now: DateTime<Utc>) -> i64 {
        match (self.running, self.start_time) {
            (true, Some(start)) => (now - start).num_seconds().max(0),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_resets_counters() {
        let now = Utc::now();
        let status = BotStatus::started(now);
        assert!(status.running);
        assert_eq!(status.start_time, Some(now));
        assert_eq!(status.total_trades, 0);
        assert!(status.errors.is_empty());
    }

    #[test]
    fn test_errors_roll_off() {
        let mut status = BotStatus::default();
        for i in 0..(MAX_STATUS_ERRORS + 5) {
            status.push_error(format!("error {}", i));
        }
        assert_eq!(status.errors.len(), MAX_STATUS_ERRORS);
        assert_eq!(status.errors[0].error, "error 5");
        assert_eq!(
            status.errors.last().map(|e| e.error.as_str()),
            Some(format!("error {}", MAX_STATUS_ERRORS + 4).as_str())
        );
    }

    #[test]
    fn test_record_trade_accumulates() {
        let mut status = BotStatus::default();
        status.record_trade(1.5);
        status.record_trade(2.25);
        assert_eq!(status.total_trades, 2);
        assert!((status.total_profit - 3.75).abs() < 1e-12);
    }

    #[test]
    fn test_uptime_only_while_running() {
        let start = Utc::now() - chrono::Duration::seconds(30);
        let mut status = BotStatus::started(start);
        assert!(status.uptime_secs(Utc::now()) >= 30);
        status.running = false;
        assert_eq!(status.uptime_secs(Utc::now()), 0);
    }
}
