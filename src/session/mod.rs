//! Payment session subsystem.
//!
//! # Data Flow
//! ```text
//! SessionHandle / DeviceLink / timers / watcher
//!     → SessionEvent channel
//!     → controller.rs (single writer)
//!     → state.rs pure transition → Vec<Effect>
//!     → controller.rs arms or stops TaskSlots, sends device commands,
//!       spawns mint and chime
//!     → DisplayState on a watch channel
//! ```
//!
//! # Design Decisions
//! - One task owns the session; nothing is locked
//! - Every phase entry bumps an epoch; timer events from older epochs are inert
//! - Side effects of a confirmed payment can never undo the transition

pub mod controller;
pub mod state;
pub mod timers;

pub use controller::{Collaborators, DisplayState, SessionController, SessionHandle};
pub use state::{Effect, ResetReason, Session, SessionEvent, SuccessPhase, View};
pub use timers::TaskSlot;
