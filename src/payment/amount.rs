//! Conversion of human-readable amounts into base units.

use alloy::primitives::utils::{format_units, parse_units, UnitsError};
use alloy::primitives::U256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmountError {
    #[error("amount must not be negative")]
    Negative,

    #[error("invalid amount: {0}")]
    Invalid(#[from] UnitsError),
}

/// Parse `"0.001"` with `decimals = 18` into `1_000_000_000_000_000`.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let amount = amount.trim();
    if amount.starts_with('-') {
        return Err(AmountError::Negative);
    }
    Ok(parse_units(amount, decimals)?.into())
}

/// Render base units back into a decimal string for display.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, decimals).unwrap_or_else(|_| amount.to_string())
}
