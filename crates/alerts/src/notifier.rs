//! Best-effort alert delivery.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Upper bound on a single delivery attempt.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Something that can deliver a text alert.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str) -> Result<(), NotifierError>;
}

/// Writes alerts to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl AlertTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &str) -> Result<(), NotifierError> {
        info!("ALERT: {}", message);
        Ok(())
    }
}

/// Keeps alerts in memory. Useful as a test double.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    messages: Mutex<Vec<String>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose every send fails.
    pub fn failing() -> Self {
        let transport = Self::default();
        transport
            .fail
            .store(true, std::sync::atomic::Ordering::SeqCst);
        transport
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl AlertTransport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, message: &str) -> Result<(), NotifierError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotifierError::Unavailable("memory transport set to fail".to_string()));
        }
        self.messages.lock().await.push(message.to_string());
        Ok(())
    }
}

/// Sends alerts through a transport without ever failing the caller.
///
/// Each send is bounded by a timeout; errors and timeouts are logged and
/// swallowed.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn AlertTransport>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(transport: Arc<dyn AlertTransport>) -> Self {
        Self {
            transport,
            timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Notifier that only logs.
    pub fn log_only() -> Self {
        Self::new(Arc::new(LogTransport))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Deliver `message`. Returns whether delivery succeeded.
    pub async fn notify(&self, message: &str) -> bool {
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(Ok(())) => {
                debug!(transport = self.transport.name(), "Alert sent");
                true
            }
            Ok(Err(e)) => {
                warn!(transport = self.transport.name(), error = %e, "Failed to send alert");
                false
            }
            Err(_) => {
                warn!(
                    transport = self.transport.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Alert send timed out"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("transport", &self.transport.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StuckTransport;

    #[async_trait]
    impl AlertTransport for StuckTransport {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn send(&self, _message: &str) -> Result<(), NotifierError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_notify_delivers() {
        let transport = Arc::new(MemoryTransport::new());
        let notifier = Notifier::new(transport.clone());
        assert!(notifier.notify("Arbitrage opportunity: BTC/USDT").await);
        assert_eq!(transport.messages().await, vec!["Arbitrage opportunity: BTC/USDT"]);
    }

    #[tokio::test]
    async fn test_notify_swallows_failures() {
        let notifier = Notifier::new(Arc::new(MemoryTransport::failing()));
        assert!(!notifier.notify("lost").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_times_out() {
        let notifier = Notifier::new(Arc::new(StuckTransport)).with_timeout(Duration::from_secs(2));
        assert!(!notifier.notify("slow").await);
    }

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        let notifier = Notifier::log_only();
        assert_eq!(notifier.transport_name(), "log");
        assert!(notifier.notify("hello").await);
    }
}
