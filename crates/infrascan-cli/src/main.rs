//! Interactive simulator for the scanner bridge.
//!
//! Wires the plugin runtime to the mock scan engine and the in-process
//! broadcast bus, then reads line commands from stdin. Results and scan
//! events are printed to stdout as JSON lines; logs go to stderr.

mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{HELP, Line};
use futures::StreamExt;
use infrascan_bridge::config::BridgeConfig;
use infrascan_bridge::intent::Intent;
use infrascan_bridge::lifecycle::LifecycleEvent;
use infrascan_bridge::plugin::{PluginHandle, ScannerPlugin};
use infrascan_bridge::transport::LocalBroadcastBus;
use infrascan_core::constants::{EXTRA_AIM_ID, EXTRA_BARCODE, EXTRA_BARCODE_TYPE, EXTRA_LENGTH};
use infrascan_hardware::{MockDeviceFactory, MockScannerHandle};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "infrascan", version, about = "Barcode scanner bridge simulator")]
struct Cli {
    /// Platform SDK level reported by the broadcast bus
    #[arg(long, default_value_t = LocalBroadcastBus::DEFAULT_SDK_INT)]
    sdk_int: u32,

    /// Start with the vendor scan service missing
    #[arg(long)]
    no_service: bool,

    /// Do not send an attach transition on startup
    #[arg(long)]
    no_attach: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// JSON bridge configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    BridgeConfig::from_json_str(&json).with_context(|| format!("invalid config {}", path.display()))
}

struct Simulator {
    scan_action: String,
    plugin: PluginHandle,
    engine: MockScannerHandle,
    bus: Arc<LocalBroadcastBus>,
}

impl Simulator {
    /// Handle one line; returns `false` when the simulator should stop.
    async fn handle(&self, line: Line) -> Result<bool> {
        match line {
            Line::Empty => {}
            Line::Call(call) => {
                let result = self.plugin.invoke(call.clone()).await?;
                println!("{}", json!({ "method": call.method, "response": result }));
            }
            Line::Listen => match self.plugin.listen().await {
                Ok(mut stream) => {
                    tokio::spawn(async move {
                        while let Some(item) = stream.next().await {
                            match item {
                                Ok(event) => println!("{}", json!({ "event": event })),
                                Err(error) => println!("{}", json!({ "error": error })),
                            }
                        }
                    });
                    println!("{}", json!({ "listening": true }));
                }
                Err(error) => {
                    let error = json!({ "code": error.code(), "message": error.to_string() });
                    println!("{}", json!({ "error": error }));
                }
            },
            Line::Cancel => {
                self.plugin.cancel().await?;
                println!("{}", json!({ "listening": false }));
            }
            Line::Scan {
                code,
                symbology,
                aim_id,
            } => {
                let length = i32::try_from(code.len()).context("code too long")?;
                let intent = Intent::new(self.scan_action.as_str())
                    .with_bytes(EXTRA_BARCODE, code.into_bytes())
                    .with_int(EXTRA_LENGTH, length)
                    .with_text(EXTRA_BARCODE_TYPE, symbology)
                    .with_text(EXTRA_AIM_ID, aim_id);
                self.broadcast(intent);
            }
            Line::Send(intent) => self.broadcast(intent),
            Line::Lifecycle(event) => {
                self.plugin.lifecycle(event).await?;
                println!("{}", json!({ "lifecycle": event }));
            }
            Line::Service(installed) => {
                self.engine.set_service_installed(installed);
                println!("{}", json!({ "service_installed": installed }));
            }
            Line::Status => {
                let status = self.plugin.status().await?;
                println!("{}", json!({ "status": status }));
            }
            Line::Help => println!("{HELP}"),
            Line::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn broadcast(&self, intent: Intent) {
        let receivers = self.bus.send_broadcast(intent);
        if receivers == 0 {
            warn!("Broadcast reached no receiver, call `listen` first");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(cli.config.as_deref())?;
    let (factory, engine) = if cli.no_service {
        MockDeviceFactory::unavailable()
    } else {
        MockDeviceFactory::new()
    };
    let bus = Arc::new(LocalBroadcastBus::with_sdk_int(cli.sdk_int));

    info!(
        version = infrascan_core::VERSION,
        sdk_int = cli.sdk_int,
        "Starting infrascan simulator"
    );
    let scan_action = config.scan_action.clone();
    let plugin = ScannerPlugin::new(config, Arc::new(factory), bus.clone())
        .start()
        .context("failed to start scanner plugin")?;
    if !cli.no_attach {
        plugin.lifecycle(LifecycleEvent::Attached).await?;
    }

    let simulator = Simulator {
        scan_action,
        plugin,
        engine,
        bus,
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let keep_going = match line.parse::<Line>() {
            Ok(line) => simulator.handle(line).await?,
            Err(error) => {
                eprintln!("{error:#}");
                true
            }
        };
        if !keep_going {
            break;
        }
    }

    simulator.plugin.shutdown().await?;
    Ok(())
}
