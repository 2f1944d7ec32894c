//! Telegram Bot API transport.

use crate::config::TelegramConfig;
use crate::notifier::{AlertTransport, NotifierError};
use async_trait::async_trait;

const API_BASE: &str = "https://api.telegram.org";

/// Sends alerts to one Telegram chat via `sendMessage`.
pub struct TelegramTransport {
    config: TelegramConfig,
    http_client: reqwest::Client,
    api_base: String,
}

impl TelegramTransport {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token)
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn format_alert_message(message: &str) -> String {
    format!(
        "🚨 <b>tickarb</b>\n{}\n\n⏰ {}",
        escape_html(message),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

#[async_trait]
impl AlertTransport for TelegramTransport {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<(), NotifierError> {
        let text = format_alert_message(message);
        let params = [
            ("chat_id", self.config.chat_id.as_str()),
            ("text", text.as_str()),
            ("parse_mode", "HTML"),
            ("disable_web_page_preview", "true"),
        ];

        let response = self.http_client.post(self.url()).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_message_is_escaped_and_branded() {
        let text = format_alert_message("spread <7>");
        assert!(text.starts_with("🚨 <b>tickarb</b>\n"));
        assert!(text.contains("spread &lt;7&gt;"));
    }

    #[test]
    fn test_url_uses_token() {
        let transport = TelegramTransport::new(TelegramConfig::new("123:abc", "42"))
            .with_api_base("http://localhost:1");
        assert_eq!(transport.url(), "http://localhost:1/bot123:abc/sendMessage");
    }
}
