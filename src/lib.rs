//! Unattended payment kiosk library.

pub mod audio;
pub mod blockchain;
pub mod config;
pub mod device;
pub mod lifecycle;
pub mod minting;
pub mod observability;
pub mod payment;
pub mod presentation;
pub mod resilience;
pub mod session;
pub mod watcher;

pub use config::schema::KioskConfig;
pub use lifecycle::Shutdown;
pub use session::{SessionController, SessionHandle};
