//! Read-only ledger access used by the chain watcher.

use async_trait::async_trait;

use crate::blockchain::types::{LedgerBlock, LedgerResult};

/// The two reads the watcher needs from a ledger.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Height of the latest block.
    async fn current_height(&self) -> LedgerResult<u64>;

    /// Block at `height` with full transaction bodies.
    async fn block_with_transactions(&self, height: u64) -> LedgerResult<LedgerBlock>;
}
