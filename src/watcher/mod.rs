//! Chain watcher: polls a moving block window for the session's payment.
//!
//! # Data Flow
//! ```text
//! interval tick (default 3 s, missed ticks skipped)
//!     → LedgerReader::current_height
//!     → window.rs  [max(start, head - lookback), head]
//!     → LedgerReader::block_with_transactions, newest block first
//!     → matcher.rs (first transaction satisfying the MatchRule)
//!     → ChainWatcher::run resolves with the TransferMatch
//! ```
//!
//! # Design Decisions
//! - `run` resolves at most once, so one watcher reports at most one match
//! - One fetch in flight at a time; a slow tick delays the next one
//! - Failed ticks are logged and backed off, never surfaced to the session

pub mod matcher;
pub mod window;

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::blockchain::{LedgerReader, LedgerResult};
use crate::config::PaymentConfig;
use crate::observability::metrics;
use crate::resilience::Backoff;

pub use matcher::{decode_transfer, MatchRule, RuleError, TokenTransfer, TRANSFER_SELECTOR};
pub use window::WatchWindow;

/// A transaction that satisfied the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferMatch {
    pub tx_hash: TxHash,
    pub payer: Address,
    pub recipient: Address,
    pub amount: U256,
    pub block_height: u64,
}

/// Polling parameters of a watcher.
#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    pub lookback_blocks: u64,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl From<&PaymentConfig> for WatcherSettings {
    fn from(config: &PaymentConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            lookback_blocks: config.lookback_blocks,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

/// Called once with the height a watcher seeded itself from.
pub type SeedListener = Box<dyn FnOnce(u64) + Send>;

/// Scans the ledger for one payment. One instance per payment phase.
pub struct ChainWatcher {
    ledger: Arc<dyn LedgerReader>,
    rule: MatchRule,
    settings: WatcherSettings,
    /// Lowest block a match may come from. `None` until seeded.
    start_block: Option<u64>,
    on_seeded: Option<SeedListener>,
}

impl ChainWatcher {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        rule: MatchRule,
        settings: WatcherSettings,
        start_block: Option<u64>,
    ) -> Self {
        Self {
            ledger,
            rule,
            settings,
            start_block,
            on_seeded: None,
        }
    }

    /// Report the lazily adopted start block to `listener`.
    pub fn on_seeded<F>(mut self, listener: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.on_seeded = Some(Box::new(listener));
        self
    }

    /// One poll tick.
    ///
    /// When no start block was seeded, the first head read successfully
    /// becomes the start block.
    pub async fn scan_once(&mut self) -> LedgerResult<Option<TransferMatch>> {
        let head = self.ledger.current_height().await?;
        let start_block = match self.start_block {
            Some(start_block) => start_block,
            None => {
                tracing::info!(start_block = head, "Watcher seeded from current head");
                self.start_block = Some(head);
                if let Some(listener) = self.on_seeded.take() {
                    listener(head);
                }
                head
            }
        };

        let Some(window) = WatchWindow::compute(start_block, head, self.settings.lookback_blocks)
        else {
            tracing::debug!(head, start_block, "Head behind start block, skipping tick");
            return Ok(None);
        };

        tracing::debug!(
            from_block = window.from_block,
            to_block = window.to_block,
            "Scanning watch window"
        );

        for height in window.descending() {
            let block = self.ledger.block_with_transactions(height).await?;
            for tx in &block.transactions {
                if let Some((recipient, amount)) = self.rule.evaluate(tx) {
                    return Ok(Some(TransferMatch {
                        tx_hash: tx.hash,
                        payer: tx.from,
                        recipient,
                        amount,
                        block_height: height,
                    }));
                }
            }
        }

        Ok(None)
    }

    /// Poll until a payment is found.
    ///
    /// Errors never end the loop. After consecutive failures an extra capped,
    /// jittered delay is inserted before the next tick.
    pub async fn run(mut self) -> TransferMatch {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut backoff = Backoff::new(self.settings.backoff_base, self.settings.backoff_max);

        tracing::info!(
            merchant = %self.rule.merchant(),
            required = %self.rule.required(),
            start_block = ?self.start_block,
            "Chain watcher started"
        );

        loop {
            ticker.tick().await;

            match self.scan_once().await {
                Ok(Some(found)) => {
                    metrics::record_chain_poll("match");
                    tracing::info!(
                        tx_hash = %found.tx_hash,
                        payer = %found.payer,
                        amount = %found.amount,
                        block = found.block_height,
                        "Matching payment found"
                    );
                    return found;
                }
                Ok(None) => {
                    metrics::record_chain_poll("empty");
                    backoff.reset();
                }
                Err(e) => {
                    metrics::record_chain_poll("error");
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        consecutive_failures = backoff.failures(),
                        retry_in_ms = delay.as_millis() as u64,
                        "Chain poll failed"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
