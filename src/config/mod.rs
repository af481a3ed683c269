//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! kiosk.toml (optional)
//!     → loader.rs (parse & deserialize, KIOSK_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → KioskConfig (validated, immutable)
//!     → sections cloned into each subsystem at start-up
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secrets (the minting key) never live in the file

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AudioConfig, DeviceConfig, KioskConfig, LedgerConfig, MintingConfig, ObservabilityConfig,
    PaymentConfig, PaymentMode, SessionConfig, UsbFilter,
};
