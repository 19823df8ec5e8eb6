//! zwave-alert
//!
//! Watches a Z-Wave mesh through zwave-js-server and sends notifications
//! for dead nodes, battery problems and notification-class events.

mod translate;
mod zwave_js;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zwa_config::AppConfig;
use zwa_engine::{AlertEngine, AlertPolicy, Classifier, NodeRegistry};
use zwa_event_bus::EventBus;
use zwa_notify::{LogTransport, MessageFormatter, Notifier, TelegramTransport, Transport};

use crate::zwave_js::ZwaveJsClient;

/// How long to wait for the stop notice to go out before exiting
const STOP_NOTICE_TIMEOUT: Duration = Duration::from_secs(5);

/// Z-Wave mesh alerting service
#[derive(Parser, Debug)]
#[command(name = "zwave-alert")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory containing zwave-alert.yaml and secrets.yaml
    #[arg(short, long, default_value = ".")]
    config: PathBuf,

    /// Log at debug level regardless of the configured level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    init_tracing(&config.logging.level, cli.verbose)?;
    info!("Starting zwave-alert");

    let transport: Arc<dyn Transport> = match &config.telegram {
        Some(telegram) => Arc::new(TelegramTransport::new(telegram)?),
        None => {
            warn!("No telegram section configured, alerts are only logged");
            Arc::new(LogTransport)
        }
    };

    let bus = Arc::new(EventBus::new());
    let registry = Arc::new(NodeRegistry::new());
    let classifier = Arc::new(Classifier::new(
        registry.clone(),
        AlertPolicy::from(&config.alerts),
    ));
    let notifier = Notifier::new(transport, MessageFormatter::new(config.alerts.title.clone()));
    let engine = AlertEngine::new(bus.clone(), classifier, notifier);

    engine.start().await;

    let client = ZwaveJsClient::new(&config.zwave_js, bus, registry);
    let client_task = tokio::spawn(client.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    client_task.abort();
    if let Some(notice) = engine.stop().await {
        if tokio::time::timeout(STOP_NOTICE_TIMEOUT, notice).await.is_err() {
            warn!("Stop notice not delivered before timeout");
        }
    }

    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(level: &str, verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["zwave-alert"]);
        assert_eq!(cli.config, PathBuf::from("."));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["zwave-alert", "--config", "/etc/zwave-alert", "-v"]);
        assert_eq!(cli.config, PathBuf::from("/etc/zwave-alert"));
        assert!(cli.verbose);
    }
}
