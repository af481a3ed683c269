//! On-chain receipt minting, fired once per confirmed payment.
//!
//! # Data Flow
//! ```text
//! Effect::MintReceipt { payer }
//!     → spawned task (never awaited by the session)
//!     → ReceiptMinter::mint_receipt(merchant, payer)
//!     → receipt.rs: simulate mintReceipt, then send
//! ```
//!
//! # Design Decisions
//! - A missing key or contract disables minting only
//! - Failures are logged and counted; the session never sees them

pub mod receipt;

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use thiserror::Error;

pub use receipt::ChainReceiptMinter;

/// Errors that can occur while minting a receipt.
#[derive(Debug, Error)]
pub enum MintError {
    /// Key, endpoint or contract missing or malformed.
    #[error("Minting not configured: {0}")]
    Configuration(String),

    /// Minting is switched off.
    #[error("Minting disabled")]
    Disabled,

    /// The simulated call reverted.
    #[error("Receipt simulation failed: {0}")]
    Simulation(String),

    /// Broadcasting the transaction failed.
    #[error("Receipt transaction failed: {0}")]
    Send(String),

    /// The call did not finish in time.
    #[error("Receipt mint timed out after {0}s")]
    Timeout(u64),
}

/// Records a receipt for a confirmed payment.
#[async_trait]
pub trait ReceiptMinter: Send + Sync {
    async fn mint_receipt(&self, merchant: Address, payer: Address) -> Result<TxHash, MintError>;
}

/// Used when minting is off or cannot be configured.
#[derive(Debug, Default, Clone)]
pub struct DisabledMinter;

#[async_trait]
impl ReceiptMinter for DisabledMinter {
    async fn mint_receipt(&self, _merchant: Address, payer: Address) -> Result<TxHash, MintError> {
        tracing::debug!(payer = %payer, "Receipt minting disabled, skipping");
        Err(MintError::Disabled)
    }
}
