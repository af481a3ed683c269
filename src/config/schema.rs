//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the kiosk.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the payment kiosk.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KioskConfig {
    /// Ledger RPC settings used by the chain watcher.
    pub ledger: LedgerConfig,

    /// What counts as a valid payment and how often to look for it.
    pub payment: PaymentConfig,

    /// Session phase durations.
    pub session: SessionConfig,

    /// Serial peripheral settings.
    pub device: DeviceConfig,

    /// Receipt minting side effect.
    pub minting: MintingConfig,

    /// Success chime.
    pub audio: AudioConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ledger (JSON-RPC) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// Chain ID (11155111 for Sepolia).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 11_155_111,
            rpc_timeout_secs: 10,
        }
    }
}

/// Which kind of transfer the watcher accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Plain value transfer of the chain's native asset.
    Native,
    /// ERC-20 `transfer(address,uint256)` call on a token contract.
    Token,
}

/// Payment matching and polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Native asset or token transfer.
    pub mode: PaymentMode,

    /// Address that must receive the payment.
    pub merchant_address: String,

    /// Human-readable minimum amount, e.g. "0.001".
    pub required_amount: String,

    /// Decimals used to scale `required_amount` into base units.
    pub decimals: u8,

    /// Token contract, required in token mode.
    pub token_contract: Option<String>,

    /// In native mode, reject transfers that carry calldata.
    pub strict_native: bool,

    /// Chain polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Number of blocks behind the head that are rescanned each tick.
    pub lookback_blocks: u64,

    /// Base delay for poll backoff after failures, in milliseconds.
    pub backoff_base_ms: u64,

    /// Maximum extra poll delay after repeated failures, in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            mode: PaymentMode::Native,
            merchant_address: String::new(),
            required_amount: "0.001".to_string(),
            decimals: 18,
            token_contract: None,
            strict_native: true,
            poll_interval_ms: 3000,
            lookback_blocks: 10,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
        }
    }
}

/// Session phase durations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds the payment screen waits before resetting.
    pub payment_timeout_secs: u32,

    /// Seconds of the success countdown.
    pub success_countdown_secs: u32,

    /// Seconds the final message stays up before reset.
    pub message_duration_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            payment_timeout_secs: 60,
            success_countdown_secs: 10,
            message_duration_secs: 5,
        }
    }
}

/// USB vendor/product pair of an allowed peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct UsbFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Serial peripheral configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Enable the serial link.
    pub enabled: bool,

    /// Allow-list of peripherals.
    pub filters: Vec<UsbFilter>,

    /// Serial baud rate.
    pub baud_rate: u32,

    /// Delay before the first reconnect attempt after a disconnect.
    pub reconnect_delay_ms: u64,

    /// Cap for reconnect backoff.
    pub max_reconnect_delay_ms: u64,

    /// Outbound command queue capacity.
    pub command_queue_capacity: usize,

    /// Read buffer size in bytes.
    pub read_buffer_size: usize,

    /// Pause after each decode/dispatch pass (0 = plain yield).
    pub read_pause_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filters: vec![
                // Arduino Uno
                UsbFilter { vendor_id: 0x2341, product_id: 0x0043 },
                // Arduino Mega 2560
                UsbFilter { vendor_id: 0x2341, product_id: 0x0042 },
                // CH340 clones
                UsbFilter { vendor_id: 0x1a86, product_id: 0x7523 },
            ],
            baud_rate: 9600,
            reconnect_delay_ms: 1000,
            max_reconnect_delay_ms: 30_000,
            command_queue_capacity: 8,
            read_buffer_size: 256,
            read_pause_ms: 10,
        }
    }
}

/// Receipt minting configuration. The signing key comes from the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MintingConfig {
    /// Enable receipt minting.
    pub enabled: bool,

    /// JSON-RPC endpoint of the receipt chain.
    pub rpc_url: String,

    /// Chain ID of the receipt chain (8453 for Base).
    pub chain_id: u64,

    /// Receipt contract address.
    pub contract_address: String,

    /// Timeout for the simulate and send calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for MintingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rpc_url: "https://mainnet.base.org".to_string(),
            chain_id: 8453,
            contract_address: "0x283e8b9129f60093aEcb16C7B7A596316a18DCbb".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Success chime configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AudioConfig {
    /// Player command and arguments, e.g. `["aplay", "/opt/kiosk/alert.wav"]`.
    /// Empty disables the chime.
    pub command: Vec<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
