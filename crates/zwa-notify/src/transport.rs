//! Delivery transports

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Errors a transport can report for one delivery attempt
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint answered with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Something that can deliver an already formatted message
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Deliver one message
    async fn deliver(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of sending them
///
/// Used when no messaging endpoint is configured.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        info!(target: "zwave_alert::notification", "{}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NotifyError::Status {
            status: 401,
            body: "Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "endpoint answered with HTTP 401: Unauthorized");

        let err = NotifyError::Unavailable("no route".to_string());
        assert_eq!(err.to_string(), "transport unavailable: no route");
    }

    #[tokio::test]
    async fn test_log_transport_always_succeeds() {
        let transport = LogTransport;
        assert_eq!(transport.name(), "log");
        assert!(transport.deliver("hello").await.is_ok());
    }
}
