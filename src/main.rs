//! Unattended payment kiosk.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                    PAYMENT KIOSK                      │
//!                 │                                                       │
//!   JSON-RPC ◀────┼── blockchain ◀── watcher ──┐                          │
//!                 │   (LedgerReader)           │ TransferMatch            │
//!                 │                            ▼                          │
//!   console ◀─────┼── presentation ◀──── session controller ──▶ minting ──┼──▶ receipt chain
//!   stdin   ──────┼──▶ SessionHandle ───▶ (single writer)     ──▶ audio   │
//!                 │                         ▲        │                    │
//!                 │             DeviceEvent │        │ RELAY_ON           │
//!                 │                         │        ▼                    │
//!   serial  ◀─────┼────────────────────── device link                     │
//!                 │                                                       │
//!                 │   config · observability · resilience · lifecycle     │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use payment_kiosk::audio::{CommandChime, SilentChime, SuccessSound};
use payment_kiosk::blockchain::BlockchainClient;
use payment_kiosk::config::{load_or_default, KioskConfig};
use payment_kiosk::device::{DeviceLink, TokioSerialTransport};
use payment_kiosk::lifecycle::Shutdown;
use payment_kiosk::minting::{ChainReceiptMinter, DisabledMinter, ReceiptMinter};
use payment_kiosk::observability::{logging, metrics};
use payment_kiosk::payment::payment_uri;
use payment_kiosk::presentation::ConsolePresenter;
use payment_kiosk::session::{Collaborators, SessionController};
use payment_kiosk::watcher::{MatchRule, WatcherSettings};

#[derive(Parser)]
#[command(name = "payment-kiosk", version)]
#[command(about = "Unattended crypto payment kiosk", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run without the serial device.
    #[arg(long)]
    no_device: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init(&config.observability);
    tracing::info!("payment-kiosk v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let rule = MatchRule::from_config(&config.payment)?;
    let uri = payment_uri(&rule, config.ledger.chain_id);
    tracing::info!(
        mode = ?config.payment.mode,
        merchant = %rule.merchant(),
        required_amount = %config.payment.required_amount,
        chain_id = config.ledger.chain_id,
        "Configuration loaded"
    );

    let ledger = Arc::new(BlockchainClient::new(config.ledger.clone()).await?);
    let collaborators = Collaborators {
        ledger,
        minter: build_minter(&config),
        chime: build_chime(&config),
    };

    let shutdown = Shutdown::new();
    let mut controller = SessionController::new(
        &config.session,
        rule,
        WatcherSettings::from(&config.payment),
        uri,
        collaborators,
    );

    let mut tasks = Vec::new();
    if config.device.enabled && !args.no_device {
        let (link, device) = DeviceLink::new(
            TokioSerialTransport::new(),
            config.device.clone(),
            controller.event_sender(),
        );
        controller.attach_device(device);
        tasks.push(tokio::spawn(link.run(shutdown.subscribe())));
    } else {
        tracing::info!("Serial device disabled");
    }

    let presenter = ConsolePresenter::new(controller.handle());
    tasks.push(tokio::spawn(presenter.run(shutdown.subscribe())));
    tasks.push(tokio::spawn(controller.run(shutdown.subscribe())));

    shutdown.trigger_on_signal().await;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Task ended abnormally");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_minter(config: &KioskConfig) -> Arc<dyn ReceiptMinter> {
    if !config.minting.enabled {
        return Arc::new(DisabledMinter);
    }
    match ChainReceiptMinter::from_env(&config.minting) {
        Ok(minter) => Arc::new(minter),
        Err(e) => {
            tracing::warn!(error = %e, "Receipt minting disabled");
            Arc::new(DisabledMinter)
        }
    }
}

fn build_chime(config: &KioskConfig) -> Arc<dyn SuccessSound> {
    match CommandChime::from_config(&config.audio) {
        Some(chime) => Arc::new(chime),
        None => Arc::new(SilentChime),
    }
}
