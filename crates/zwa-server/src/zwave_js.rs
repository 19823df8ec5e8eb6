//! zwave-js-server websocket client
//!
//! Connects to the server, asks it to start listening, and publishes the
//! translated node events on the event bus. The connection is re-opened
//! after a delay whenever it drops.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, trace, warn};
use zwa_config::ZwaveJsConfig;
use zwa_core::events::NodeEvent;
use zwa_engine::NodeRegistry;
use zwa_event_bus::EventBus;

use crate::translate::{ServerMessage, Translator, START_LISTENING_ID};

/// Long-running connection to a zwave-js-server instance
pub struct ZwaveJsClient {
    url: String,
    reconnect_delay: Duration,
    bus: Arc<EventBus>,
    translator: Translator,
}

impl ZwaveJsClient {
    pub fn new(config: &ZwaveJsConfig, bus: Arc<EventBus>, registry: Arc<NodeRegistry>) -> Self {
        Self {
            url: config.url.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_secs),
            bus,
            translator: Translator::new(registry),
        }
    }

    /// Keep a session open until the task is cancelled
    pub async fn run(mut self) {
        loop {
            match self.session().await {
                Ok(()) => info!(url = %self.url, "Connection to zwave-js-server closed"),
                Err(e) => warn!(url = %self.url, error = %e, "zwave-js-server connection failed"),
            }
            debug!(
                delay_secs = self.reconnect_delay.as_secs(),
                "Reconnecting to zwave-js-server"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn session(&mut self) -> Result<()> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("connecting to {}", self.url))?;
        info!(url = %self.url, "Connected to zwave-js-server");

        let (mut write, mut read) = stream.split();

        let start = json!({
            "messageId": START_LISTENING_ID,
            "command": "start_listening"
        });
        write
            .send(Message::Text(start.to_string()))
            .await
            .context("sending start_listening")?;

        while let Some(message) = read.next().await {
            match message.context("reading from zwave-js-server")? {
                Message::Text(text) => self.handle_text(&text),
                Message::Close(frame) => {
                    debug!(?frame, "Server closed the connection");
                    break;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str) {
        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed message from zwave-js-server");
                return;
            }
        };

        match message {
            ServerMessage::Version {
                driver_version,
                server_version,
            } => {
                info!(%driver_version, %server_version, "zwave-js-server version");
            }
            ServerMessage::Result {
                message_id,
                success: true,
                result,
                ..
            } if message_id == START_LISTENING_ID => {
                let result = result.unwrap_or_default();
                for event in self.translator.seed(&result) {
                    self.publish(event);
                }
            }
            ServerMessage::Result {
                message_id,
                success: false,
                error_code,
                ..
            } => {
                warn!(%message_id, error_code = ?error_code, "zwave-js-server command failed");
            }
            ServerMessage::Result { message_id, .. } => {
                trace!(%message_id, "Ignoring command result");
            }
            ServerMessage::Event { event } => {
                if let Some(node_event) = self.translator.translate(&event) {
                    self.publish(node_event);
                }
            }
            ServerMessage::Unknown => trace!("Ignoring unknown message type"),
        }
    }

    fn publish(&self, event: NodeEvent) {
        let node_id = event.node_id();
        let receivers = match event {
            NodeEvent::ValueChanged(data) => self.bus.publish_typed(&data),
            NodeEvent::Removed(data) => self.bus.publish_typed(&data),
            NodeEvent::Status(data) => self.bus.publish_typed(&data),
        };
        if receivers == 0 {
            debug!(node_id, "No subscriber for node event");
        }
    }
}
