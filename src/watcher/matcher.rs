//! Transaction predicates and ERC-20 transfer calldata decoding.
//!
//! # Wire format (token transfers)
//! ```text
//! bytes  0..4   selector a9 05 9c bb  (transfer(address,uint256))
//! bytes  4..36  recipient, left-padded; address = rightmost 20 bytes
//! bytes 36..68  amount, 32-byte big-endian unsigned
//! ```
//! Anything shorter than 68 bytes is never a match.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;

use crate::blockchain::LedgerTransaction;
use crate::config::{PaymentConfig, PaymentMode};
use crate::payment::amount::{parse_amount, AmountError};

sol! {
    /// ERC-20 transfer, used here only for its selector.
    function transfer(address to, uint256 amount) external returns (bool);
}

/// `0xa9059cbb`.
pub const TRANSFER_SELECTOR: [u8; 4] = transferCall::SELECTOR;

/// Minimum calldata length of a `transfer` call.
pub const TRANSFER_CALLDATA_LEN: usize = 68;

/// Recipient and amount decoded from `transfer` calldata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    pub recipient: Address,
    pub amount: U256,
}

/// Decode `transfer(address,uint256)` calldata.
///
/// The 12 padding bytes in front of the recipient are not checked; only the
/// rightmost 20 bytes of the word are taken.
pub fn decode_transfer(calldata: &[u8]) -> Option<TokenTransfer> {
    if calldata.len() < TRANSFER_CALLDATA_LEN || calldata[..4] != TRANSFER_SELECTOR {
        return None;
    }
    Some(TokenTransfer {
        recipient: Address::from_slice(&calldata[16..36]),
        amount: U256::from_be_slice(&calldata[36..68]),
    })
}

/// What a payment must look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule {
    /// Native-asset transfer to the merchant.
    Native {
        merchant: Address,
        required: U256,
        /// Reject transactions that carry calldata (contract calls).
        strict: bool,
    },
    /// ERC-20 `transfer` on `token` to the merchant.
    Token {
        token: Address,
        merchant: Address,
        required: U256,
    },
}

/// Why a payment section cannot be turned into a rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("invalid merchant address '{0}'")]
    Merchant(String),

    #[error("invalid token contract '{0}'")]
    Token(String),

    #[error("token mode requires payment.token_contract")]
    MissingToken,

    #[error(transparent)]
    Amount(#[from] AmountError),
}

impl MatchRule {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, RuleError> {
        let merchant: Address = config
            .merchant_address
            .parse()
            .map_err(|_| RuleError::Merchant(config.merchant_address.clone()))?;
        let required = parse_amount(&config.required_amount, config.decimals)?;

        match config.mode {
            PaymentMode::Native => Ok(Self::Native {
                merchant,
                required,
                strict: config.strict_native,
            }),
            PaymentMode::Token => {
                let raw = config.token_contract.as_deref().ok_or(RuleError::MissingToken)?;
                let token = raw.parse().map_err(|_| RuleError::Token(raw.to_string()))?;
                Ok(Self::Token {
                    token,
                    merchant,
                    required,
                })
            }
        }
    }

    pub fn merchant(&self) -> Address {
        match self {
            Self::Native { merchant, .. } | Self::Token { merchant, .. } => *merchant,
        }
    }

    pub fn required(&self) -> U256 {
        match self {
            Self::Native { required, .. } | Self::Token { required, .. } => *required,
        }
    }

    /// Recipient and amount of `tx` if it satisfies the rule.
    pub fn evaluate(&self, tx: &LedgerTransaction) -> Option<(Address, U256)> {
        let to = tx.to?;
        match self {
            Self::Native {
                merchant,
                required,
                strict,
            } => {
                let accepted = to == *merchant
                    && tx.value >= *required
                    && (!*strict || tx.input.is_empty());
                accepted.then_some((to, tx.value))
            }
            Self::Token {
                token,
                merchant,
                required,
            } => {
                if to != *token {
                    return None;
                }
                let transfer = decode_transfer(&tx.input)?;
                (transfer.recipient == *merchant && transfer.amount >= *required)
                    .then_some((transfer.recipient, transfer.amount))
            }
        }
    }

    pub fn matches(&self, tx: &LedgerTransaction) -> bool {
        self.evaluate(tx).is_some()
    }
}
