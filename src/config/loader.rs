//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::KioskConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Overrides `ledger.rpc_url`.
pub const RPC_URL_ENV_VAR: &str = "KIOSK_RPC_URL";
/// Overrides `payment.merchant_address`.
pub const MERCHANT_ADDRESS_ENV_VAR: &str = "KIOSK_MERCHANT_ADDRESS";
/// Overrides `minting.rpc_url`.
pub const MINT_RPC_URL_ENV_VAR: &str = "KIOSK_MINT_RPC_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides, and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<KioskConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: KioskConfig = toml::from_str(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Start from defaults when no file is given; the environment still applies.
pub fn load_or_default(path: Option<&Path>) -> Result<KioskConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let mut config = KioskConfig::default();
            apply_env_overrides(&mut config, |key| std::env::var(key).ok());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Apply environment overrides through `lookup` so tests need not touch the
/// process environment.
pub fn apply_env_overrides<F>(config: &mut KioskConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(RPC_URL_ENV_VAR) {
        config.ledger.rpc_url = url;
    }
    if let Some(address) = lookup(MERCHANT_ADDRESS_ENV_VAR) {
        config.payment.merchant_address = address;
    }
    if let Some(url) = lookup(MINT_RPC_URL_ENV_VAR) {
        config.minting.rpc_url = url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MERCHANT: &str = "0x35321cc55704948ee8c79f3c03cd0fcb055a3ac0";

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [payment]
            merchant_address = "{MERCHANT}"
            required_amount = "0.002"

            [session]
            payment_timeout_secs = 90
            "#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.session.payment_timeout_secs, 90);
        assert_eq!(config.payment.required_amount, "0.002");
    }

    #[test]
    fn test_invalid_file_reports_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[payment]\nmerchant_address = \"bogus\"").unwrap();

        match load_config(file.path()) {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors[0].field, "payment.merchant_address")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[payment").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = KioskConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            RPC_URL_ENV_VAR => Some("https://rpc.sepolia.org".to_string()),
            MERCHANT_ADDRESS_ENV_VAR => Some(MERCHANT.to_string()),
            _ => None,
        });
        assert_eq!(config.ledger.rpc_url, "https://rpc.sepolia.org");
        assert_eq!(config.payment.merchant_address, MERCHANT);
        assert_eq!(config.minting.rpc_url, "https://mainnet.base.org");
    }
}
