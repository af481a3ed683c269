//! Chain-specific types and error definitions.

use alloy::consensus::Transaction as _;
use alloy::network::TransactionResponse;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

/// Errors that can occur while reading the ledger.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node does not know the requested block (yet).
    #[error("Block {0} not found")]
    MissingBlock(u64),

    /// The node returned a block we cannot scan.
    #[error("Malformed block {height}: {reason}")]
    MalformedBlock { height: u64, reason: String },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for ledger reads.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A transaction as seen by the matcher.
///
/// Fields are typed at the RPC boundary; `to` is `None` only for contract
/// creations, which never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl LedgerTransaction {
    /// Convert a full RPC transaction object.
    pub fn from_rpc(tx: &alloy::rpc::types::Transaction) -> Self {
        Self {
            hash: tx.tx_hash(),
            from: TransactionResponse::from(tx),
            to: tx.to(),
            value: tx.value(),
            input: tx.input().clone(),
        }
    }
}

/// A block with its transactions in native order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBlock {
    pub number: u64,
    pub transactions: Vec<LedgerTransaction>,
}

impl LedgerBlock {
    /// Convert an RPC block fetched with full transactions.
    pub fn from_rpc(number: u64, block: alloy::rpc::types::Block) -> LedgerResult<Self> {
        let transactions = block
            .try_into_transactions()
            .map_err(|_| LedgerError::MalformedBlock {
                height: number,
                reason: "transaction bodies missing".to_string(),
            })?;

        Ok(Self {
            number,
            transactions: transactions.iter().map(LedgerTransaction::from_rpc).collect(),
        })
    }
}
