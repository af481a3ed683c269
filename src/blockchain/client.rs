//! Blockchain RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to JSON-RPC endpoint (plus failovers)
//! - Query the head height and full blocks for the watcher
//! - Handle timeouts and network errors gracefully

use alloy::eips::BlockNumberOrTag;
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::ledger::LedgerReader;
use crate::blockchain::types::{ChainId, LedgerBlock, LedgerError, LedgerResult};
use crate::config::LedgerConfig;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<Arc<dyn Provider + Send + Sync>>,
    /// Configuration.
    config: LedgerConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a new blockchain client.
    ///
    /// Only URL parsing can fail here; an unreachable node is reported by the
    /// first query instead.
    pub async fn new(config: LedgerConfig) -> LedgerResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            LedgerError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url))
            as Arc<dyn Provider + Send + Sync>);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url))
                    as Arc<dyn Provider + Send + Sync>);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rpc_url = %config.rpc_url,
                    chain_id = config.chain_id,
                    "Ledger client initialized"
                );
            }
            Err(e) => {
                // The kiosk still starts; the watcher keeps retrying per tick.
                tracing::warn!(
                    error = %e,
                    "Ledger client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> LedgerResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(LedgerError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Get the chain ID from the RPC.
    pub async fn get_chain_id(&self) -> LedgerResult<ChainId> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_chain_id();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(ChainId(result)),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, "RPC timeout, trying next provider");
                }
            }
        }
        Err(LedgerError::Rpc("All RPC providers failed".to_string()))
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> LedgerResult<u64> {
        for (i, provider) in self.providers.iter().enumerate() {
            let fut = provider.get_block_number();
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => tracing::warn!(provider_idx = i, error = %e, "RPC error"),
                Err(_) => tracing::warn!(provider_idx = i, "RPC timeout"),
            }
        }
        Err(LedgerError::Rpc("All providers failed to get block number".to_string()))
    }

    /// Get a block with full transaction bodies.
    ///
    /// A provider that does not know the block yet is treated like a failed
    /// one, so a lagging primary falls through to the failovers.
    pub async fn get_block_with_transactions(&self, height: u64) -> LedgerResult<LedgerBlock> {
        let mut last_error = LedgerError::Rpc("All providers failed to get block".to_string());

        for (i, provider) in self.providers.iter().enumerate() {
            let fut = async {
                provider
                    .get_block_by_number(BlockNumberOrTag::Number(height))
                    .full()
                    .await
            };
            match timeout(self.timeout_duration, fut).await {
                Ok(Ok(Some(block))) => return LedgerBlock::from_rpc(height, block),
                Ok(Ok(None)) => {
                    tracing::debug!(provider_idx = i, height, "Block not available yet");
                    last_error = LedgerError::MissingBlock(height);
                }
                Ok(Err(e)) => tracing::warn!(provider_idx = i, height, error = %e, "RPC error"),
                Err(_) => {
                    tracing::warn!(provider_idx = i, height, "RPC timeout");
                    last_error = LedgerError::Timeout(self.config.rpc_timeout_secs);
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl LedgerReader for BlockchainClient {
    async fn current_height(&self) -> LedgerResult<u64> {
        self.get_block_number().await
    }

    async fn block_with_transactions(&self, height: u64) -> LedgerResult<LedgerBlock> {
        self.get_block_with_transactions(height).await
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
