//! Alert dispatcher
//!
//! This module provides the `AlertEngine`, which wires the event bus to the
//! classifier and the classifier to the notifier, and owns the lifecycle:
//! a notice when alerting starts, one when it stops, and event processing
//! in between.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use zwa_core::events::NodeEvent;
use zwa_core::{Event, Severity};
use zwa_event_bus::EventBus;
use zwa_notify::Notifier;

use crate::classifier::Classifier;

/// Notice sent when alerting starts
pub const STARTED_MESSAGE: &str = "alert system started";

/// Notice sent when alerting stops
pub const STOPPED_MESSAGE: &str = "alert system stopped";

/// Routes controller events through the classifier to the notifier
///
/// Events are handled one at a time, in the order the bus delivered them.
/// Notifications are handed off without waiting for delivery.
pub struct AlertEngine {
    event_bus: Arc<EventBus>,
    classifier: Arc<Classifier>,
    notifier: Notifier,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AlertEngine {
    pub fn new(event_bus: Arc<EventBus>, classifier: Arc<Classifier>, notifier: Notifier) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            event_bus,
            classifier,
            notifier,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    /// Start processing events
    ///
    /// Sends the start notice and subscribes before returning, so every
    /// event published afterwards is seen.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Alert engine already running");
            return;
        }

        info!(transport = self.notifier.transport_name(), "Starting alert engine");

        let mut event_rx = self.event_bus.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.notifier.send(STARTED_MESSAGE, Severity::Info);

        let classifier = self.classifier.clone();
        let notifier = self.notifier.clone();
        let running = self.running.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown_rx.recv() => {
                        debug!("Received shutdown signal");
                        break;
                    }
                    event_result = event_rx.recv() => {
                        match event_result {
                            Ok(event) => Self::process_event(&event, &classifier, &notifier),
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                warn!("Alert engine lagged by {} events", n);
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                info!("Event bus closed, stopping alert engine");
                                running.store(false, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                }
            }
        });

        *self.task.lock().await = Some(handle);
    }

    /// Stop processing events
    ///
    /// No event is processed once this returns. Open suppression windows
    /// are discarded and the stop notice is sent; the returned handle
    /// completes when its delivery attempt has finished.
    pub async fn stop(&self) -> Option<JoinHandle<()>> {
        let handle = self.task.lock().await.take()?;

        info!("Stopping alert engine");
        let _ = self.shutdown_tx.send(());
        if let Err(e) = handle.await {
            warn!(error = %e, "Alert engine task ended abnormally");
        }

        self.classifier.windows().clear();
        self.running.store(false, Ordering::SeqCst);
        info!("Alert engine stopped");

        Some(self.notifier.send(STOPPED_MESSAGE, Severity::Info))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Classify one bus event and hand any alert to the notifier
    fn process_event(event: &Event<serde_json::Value>, classifier: &Classifier, notifier: &Notifier) {
        let Some(node_event) = NodeEvent::from_event(event) else {
            trace!(event_type = %event.event_type, "Ignoring event");
            return;
        };

        if let Some(alert) = classifier.classify(&node_event) {
            info!(
                node_id = alert.node_id,
                severity = %alert.severity,
                "Sending alert"
            );
            notifier.notify(&alert);
        }
    }
}
