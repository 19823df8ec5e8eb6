//! Telegram Bot API transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use zwa_config::TelegramConfig;

use crate::transport::{NotifyError, Transport};

/// Sends messages through the Bot API `sendMessage` method
///
/// The HTTP client is created once and reused for the process lifetime.
pub struct TelegramTransport {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramTransport {
    /// Build a transport from configuration
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Unavailable` if the HTTP client cannot be
    /// initialized (e.g. TLS backend failure).
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Unavailable(format!("cannot create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: send_message_url(&config.api_url, &config.api_key),
            chat_id: config.chat_id.clone(),
        })
    }
}

fn send_message_url(api_url: &str, api_key: &str) -> String {
    format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), api_key)
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        let params = [
            ("parse_mode", "Markdown"),
            ("chat_id", self.chat_id.as_str()),
            ("text", text),
        ];

        let response = self.client.post(&self.endpoint).form(&params).send().await?;
        let status = response.status();
        if status.is_success() {
            debug!(chat_id = %self.chat_id, "Message delivered");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_message_url() {
        assert_eq!(
            send_message_url("https://api.telegram.org/", "123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_new_from_config() {
        let config = TelegramConfig {
            api_key: "123:abc".to_string(),
            chat_id: "-42".to_string(),
            api_url: "http://localhost:8081".to_string(),
            timeout_secs: 3,
        };
        let transport = TelegramTransport::new(&config).unwrap();

        assert_eq!(transport.name(), "telegram");
        assert_eq!(transport.endpoint, "http://localhost:8081/bot123:abc/sendMessage");
        assert_eq!(transport.chat_id, "-42");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error() {
        let config = TelegramConfig {
            api_key: "k".to_string(),
            chat_id: "1".to_string(),
            // Port 9 (discard) on localhost is expected to refuse connections
            api_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
        };
        let transport = TelegramTransport::new(&config).unwrap();

        assert!(transport.deliver("hello").await.is_err());
    }
}
