//! Hot-wallet key loading for the receipt minter.
//!
//! # Security
//! - The private key is loaded ONLY from an environment variable
//! - Keys are never logged or serialized
//! - This key signs receipt mints only; payments are observed, never signed

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use thiserror::Error;

/// Environment variable name for the minter's private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "KIOSK_MINTER_PRIVATE_KEY";

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Environment variable {0} not set")]
    MissingKey(&'static str),

    #[error("Invalid private key format: {0}")]
    InvalidKey(String),
}

/// Signing key for receipt mints.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `chain_id` - Chain ID for EIP-155 replay protection
    pub fn from_private_key(private_key_hex: &str, chain_id: u64) -> Result<Self, WalletError> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| WalletError::InvalidKey(format!("{}", e)))?;
        let signer = signer.with_chain_id(Some(chain_id));

        tracing::info!(
            address = %signer.address(),
            chain_id = chain_id,
            "Minter wallet initialized"
        );

        Ok(Self { signer })
    }

    /// Load wallet from `KIOSK_MINTER_PRIVATE_KEY`.
    pub fn from_env(chain_id: u64) -> Result<Self, WalletError> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR)
            .map_err(|_| WalletError::MissingKey(PRIVATE_KEY_ENV_VAR))?;

        Self::from_private_key(&private_key, chain_id)
    }

    /// Address that pays for mints.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Consume into the signer for a provider wallet filler.
    pub fn into_signer(self) -> PrivateKeySigner {
        self.signer
    }
}
