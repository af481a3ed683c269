//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! LedgerConfig (RPC URL + failovers)
//!     → client.rs (RPC connection with timeouts)
//!     → ledger.rs (LedgerReader: head height, full blocks)
//!     → watcher (block window scan)
//!
//! KIOSK_MINTER_PRIVATE_KEY
//!     → wallet.rs (key loading)
//!     → minting (receipt side effect)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable

pub mod client;
pub mod ledger;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use ledger::LedgerReader;
pub use types::{ChainId, LedgerBlock, LedgerError, LedgerResult, LedgerTransaction};
pub use wallet::Wallet;
