//! EIP-681 payment request URIs.
//!
//! The kiosk shows this string as a QR code so that a wallet can prefill the
//! transfer. Rendering the code itself is left to the presentation layer.

use alloy::primitives::{Address, U256};

use crate::watcher::MatchRule;

/// Build the payment URI for a match rule on `chain_id`.
///
/// ```text
/// native: ethereum:<merchant>@<chain_id>?value=<wei>
/// token:  ethereum:<token>@<chain_id>/transfer?address=<merchant>&uint256=<amount>
/// ```
pub fn payment_uri(rule: &MatchRule, chain_id: u64) -> String {
    match rule {
        MatchRule::Native {
            merchant, required, ..
        } => native_uri(*merchant, *required, chain_id),
        MatchRule::Token {
            token,
            merchant,
            required,
        } => format!(
            "ethereum:{}@{}/transfer?address={}&uint256={}",
            token, chain_id, merchant, required
        ),
    }
}

fn native_uri(merchant: Address, value: U256, chain_id: u64) -> String {
    format!("ethereum:{}@{}?value={}", merchant, chain_id, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const MERCHANT: Address = address!("35321cc55704948ee8c79f3c03cd0fcb055a3ac0");

    #[test]
    fn test_native_uri() {
        let rule = MatchRule::Native {
            merchant: MERCHANT,
            required: U256::from(1_000_000_000_000_000u64),
            strict: true,
        };
        assert_eq!(
            payment_uri(&rule, 11_155_111),
            format!("ethereum:{}@11155111?value=1000000000000000", MERCHANT)
        );
    }

    #[test]
    fn test_token_uri() {
        let token = address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238");
        let rule = MatchRule::Token {
            token,
            merchant: MERCHANT,
            required: U256::from(1000),
        };
        let uri = payment_uri(&rule, 11_155_111);
        assert!(uri.starts_with(&format!("ethereum:{}@11155111/transfer?", token)));
        assert!(uri.ends_with(&format!("address={}&uint256=1000", MERCHANT)));
    }
}
