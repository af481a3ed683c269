//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Chain poll tick fails        → backoff.rs (extra delay before next tick)
//! Serial reconnect attempt fails → backoff.rs (delay before next attempt)
//! Success                       → Backoff::reset
//! ```
//!
//! # Design Decisions
//! - Every retry path is capped and resets on success

pub mod backoff;

pub use backoff::{calculate_backoff, Backoff};
