use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

use payment_kiosk::blockchain::BlockchainClient;
use payment_kiosk::config::load_or_default;
use payment_kiosk::device::TokioSerialTransport;
use payment_kiosk::payment::{format_amount, payment_uri};
use payment_kiosk::watcher::MatchRule;

#[derive(Parser)]
#[command(name = "kiosk-cli")]
#[command(about = "Setup and diagnostics for the payment kiosk", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List USB serial ports and whether the allow-list accepts them
    Ports,
    /// Print the payment request URI a wallet would scan
    Uri,
    /// Query the ledger's current block height
    Head,
    /// Load and validate the configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Ports => {
            let ports = TokioSerialTransport::enumerate().await?;
            let listed: Vec<_> = ports
                .iter()
                .map(|port| {
                    json!({
                        "port": port,
                        "allowed": port.matches(&config.device.filters),
                    })
                })
                .collect();
            print_json(&json!(listed))?;
        }
        Commands::Uri => {
            let rule = MatchRule::from_config(&config.payment)?;
            print_json(&json!({
                "uri": payment_uri(&rule, config.ledger.chain_id),
                "merchant": rule.merchant(),
                "amount": format_amount(rule.required(), config.payment.decimals),
                "base_units": rule.required().to_string(),
            }))?;
        }
        Commands::Head => {
            let client = BlockchainClient::new(config.ledger.clone()).await?;
            let chain_id = client.get_chain_id().await?;
            let height = client.get_block_number().await?;
            print_json(&json!({
                "rpc_url": config.ledger.rpc_url,
                "chain_id": chain_id.0,
                "height": height,
            }))?;
        }
        Commands::CheckConfig => {
            print_json(&json!({ "valid": true, "config": config }))?;
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
