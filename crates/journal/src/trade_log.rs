//! Append-only trade log, one JSON record per line.

use crate::error::io_error;
use crate::JournalResult;
use std::path::{Path, PathBuf};
use tickarb_core::TradeRecord;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub struct TradeLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TradeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &TradeRecord) -> JournalResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_error(&self.path))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(io_error(&self.path))?;
        file.flush().await.map_err(io_error(&self.path))?;
        Ok(())
    }

    /// Last `n` lines, oldest first. A missing file has no lines.
    pub async fn tail(&self, n: usize) -> JournalResult<Vec<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.path)(e)),
        };
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tickarb_core::{EvaluatedOpportunity, Exchange, Opportunity, Symbol};

    fn record(amount: f64) -> TradeRecord {
        let symbol = Symbol::new("ETH", "USDT").unwrap();
        TradeRecord::simulated(EvaluatedOpportunity {
            opportunity: Opportunity::spatial(symbol, Exchange::Binance, 3000.0, Exchange::Kucoin, 3010.0)
                .unwrap(),
            trade_amount: amount,
            buy_fee: 0.001,
            sell_fee: 0.001,
            net_profit: 3.99,
            liquidity_ok: true,
        })
    }

    #[tokio::test]
    async fn test_missing_file_has_no_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = TradeLog::new(dir.path().join("trades.log"));
        assert!(log.tail(50).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_json_record_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = TradeLog::new(dir.path().join("trades.log"));
        let first = record(1.0);
        let second = record(2.0);
        log.append(&first).await.unwrap();
        log.append(&second).await.unwrap();

        let lines = log.tail(50).await.unwrap();
        assert_eq!(lines.len(), 2);
        let parsed: Vec<TradeRecord> = lines
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed, vec![first, second]);
    }

    #[tokio::test]
    async fn test_tail_returns_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = TradeLog::new(dir.path().join("trades.log"));
        for i in 0..10 {
            log.append(&record(i as f64 + 1.0)).await.unwrap();
        }

        let lines = log.tail(3).await.unwrap();
        assert_eq!(lines.len(), 3);
        let last: TradeRecord = serde_json::from_str(&lines[2]).unwrap();
        assert_eq!(last.opportunity.trade_amount, 10.0);
    }
}
