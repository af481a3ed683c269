//! Configuration validation.
//!
//! Serde handles the syntax; this checks that addresses parse, amounts are
//! positive and durations are usable. All errors are collected, not just the
//! first one.

use std::fmt;

use alloy::primitives::Address;

use crate::config::schema::{KioskConfig, PaymentMode};
use crate::payment::amount::parse_amount;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &KioskConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.ledger.rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::new("ledger.rpc_url", "not a valid URL"));
    }
    if config.ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.rpc_timeout_secs", "must be > 0"));
    }

    let payment = &config.payment;
    if payment.merchant_address.parse::<Address>().is_err() {
        errors.push(ValidationError::new(
            "payment.merchant_address",
            format!("'{}' is not an address", payment.merchant_address),
        ));
    }
    match parse_amount(&payment.required_amount, payment.decimals) {
        Ok(amount) if amount.is_zero() => {
            errors.push(ValidationError::new("payment.required_amount", "must be > 0"));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::new("payment.required_amount", e.to_string())),
    }
    if payment.mode == PaymentMode::Token {
        match &payment.token_contract {
            Some(token) if token.parse::<Address>().is_ok() => {}
            Some(token) => errors.push(ValidationError::new(
                "payment.token_contract",
                format!("'{}' is not an address", token),
            )),
            None => errors.push(ValidationError::new(
                "payment.token_contract",
                "required in token mode",
            )),
        }
    }
    if payment.poll_interval_ms == 0 {
        errors.push(ValidationError::new("payment.poll_interval_ms", "must be > 0"));
    }
    if payment.backoff_base_ms > payment.backoff_max_ms {
        errors.push(ValidationError::new(
            "payment.backoff_base_ms",
            "must not exceed backoff_max_ms",
        ));
    }

    if config.session.payment_timeout_secs == 0 {
        errors.push(ValidationError::new("session.payment_timeout_secs", "must be > 0"));
    }

    let device = &config.device;
    if device.enabled {
        if device.filters.is_empty() {
            errors.push(ValidationError::new("device.filters", "at least one filter required"));
        }
        if device.baud_rate == 0 {
            errors.push(ValidationError::new("device.baud_rate", "must be > 0"));
        }
        if device.command_queue_capacity == 0 {
            errors.push(ValidationError::new("device.command_queue_capacity", "must be > 0"));
        }
        if device.read_buffer_size == 0 {
            errors.push(ValidationError::new("device.read_buffer_size", "must be > 0"));
        }
    }

    if config.minting.enabled {
        if config.minting.contract_address.parse::<Address>().is_err() {
            errors.push(ValidationError::new("minting.contract_address", "not an address"));
        }
        if config.minting.rpc_url.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new("minting.rpc_url", "not a valid URL"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
