//! Payment request helpers shared by the kiosk binary and the CLI.

pub mod amount;
pub mod uri;

pub use amount::{format_amount, parse_amount};
pub use uri::payment_uri;
