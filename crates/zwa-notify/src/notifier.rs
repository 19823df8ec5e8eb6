//! Fire-and-forget notifier

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zwa_core::{Alert, Severity};

use crate::format::MessageFormatter;
use crate::transport::Transport;

/// Formats alerts and hands them to a transport without waiting
///
/// Each delivery runs on its own task. Failures are logged as warnings and
/// never retried; callers cannot observe them.
#[derive(Clone)]
pub struct Notifier {
    transport: Arc<dyn Transport>,
    formatter: MessageFormatter,
}

impl Notifier {
    pub fn new(transport: Arc<dyn Transport>, formatter: MessageFormatter) -> Self {
        Self {
            transport,
            formatter,
        }
    }

    /// Send a one-line message
    pub fn send(&self, text: &str, severity: Severity) -> JoinHandle<()> {
        self.dispatch(self.formatter.text(text, severity))
    }

    /// Send a classifier alert
    pub fn notify(&self, alert: &Alert) -> JoinHandle<()> {
        self.dispatch(self.formatter.alert(alert))
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Spawn the delivery of an already formatted message
    ///
    /// The handle may be dropped; awaiting it only tells that the attempt
    /// finished, not whether it succeeded.
    fn dispatch(&self, message: String) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            match transport.deliver(&message).await {
                Ok(()) => debug!(transport = transport.name(), "Notification sent"),
                Err(e) => warn!(
                    transport = transport.name(),
                    error = %e,
                    "Error sending alert"
                ),
            }
        })
    }
}
