//! Receipt contract client.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::timeout;

use crate::blockchain::Wallet;
use crate::config::MintingConfig;
use crate::minting::{MintError, ReceiptMinter};
use crate::observability::metrics;

sol! {
    #[sol(rpc)]
    contract ReceiptRegistry {
        function mintReceipt(address _merchantAddress, address _payer, uint256 _timestamp) external;
    }
}

/// Mints receipts with a hot wallet on the receipt chain.
pub struct ChainReceiptMinter {
    provider: DynProvider,
    contract: Address,
    timeout_secs: u64,
}

impl ChainReceiptMinter {
    pub fn new(config: &MintingConfig, wallet: Wallet) -> Result<Self, MintError> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            MintError::Configuration(format!("invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let contract: Address = config.contract_address.parse().map_err(|e| {
            MintError::Configuration(format!(
                "invalid contract address '{}': {}",
                config.contract_address, e
            ))
        })?;

        let minter_address = wallet.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.into_signer()))
            .connect_http(url)
            .erased();

        tracing::info!(
            contract = %contract,
            minter = %minter_address,
            chain_id = config.chain_id,
            "Receipt minter initialized"
        );

        Ok(Self {
            provider,
            contract,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Build from config with the key taken from `KIOSK_MINTER_PRIVATE_KEY`.
    pub fn from_env(config: &MintingConfig) -> Result<Self, MintError> {
        let wallet = Wallet::from_env(config.chain_id)
            .map_err(|e| MintError::Configuration(e.to_string()))?;
        Self::new(config, wallet)
    }

    fn deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[async_trait]
impl ReceiptMinter for ChainReceiptMinter {
    async fn mint_receipt(&self, merchant: Address, payer: Address) -> Result<TxHash, MintError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let registry = ReceiptRegistry::new(self.contract, self.provider.clone());
        let call = registry.mintReceipt(merchant, payer, U256::from(timestamp));

        tracing::info!(payer = %payer, timestamp, "Minting receipt");

        // Simulate first so a revert costs no gas.
        let simulated = timeout(self.deadline(), call.call()).await.map_err(|_| {
            metrics::record_receipt_mint("timeout");
            MintError::Timeout(self.timeout_secs)
        })?;
        if let Err(e) = simulated {
            metrics::record_receipt_mint("reverted");
            return Err(MintError::Simulation(e.to_string()));
        }

        let sent = timeout(self.deadline(), call.send()).await.map_err(|_| {
            metrics::record_receipt_mint("timeout");
            MintError::Timeout(self.timeout_secs)
        })?;
        let pending = sent.map_err(|e| {
            metrics::record_receipt_mint("failed");
            MintError::Send(e.to_string())
        })?;

        let tx_hash = *pending.tx_hash();
        metrics::record_receipt_mint("sent");
        tracing::info!(tx_hash = %tx_hash, payer = %payer, "Receipt mint submitted");
        Ok(tx_hash)
    }
}
