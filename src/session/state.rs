//! Session state machine.
//!
//! Every operation is a pure transition that returns the effects the
//! controller must carry out. Timer-driven operations take the epoch that
//! armed the timer and do nothing when it is stale.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;

use crate::blockchain::LedgerError;
use crate::config::SessionConfig;
use crate::device::DeviceEvent;
use crate::watcher::TransferMatch;

const STATUS_IDLE: &str = "Press the button or tap Pay to start";
const STATUS_WAITING: &str = "Waiting for payment";
const STATUS_LEDGER_DOWN: &str = "Ledger unavailable, still watching for payment";
const STATUS_CONFIRMED: &str = "Payment confirmed";
const STATUS_THANK_YOU: &str = "Thank you!";

/// Screen the kiosk is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Landing,
    Payment,
    Success,
}

/// Sub-phase of the success screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessPhase {
    #[default]
    Timer,
    Message,
}

/// Why a session went back to the landing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    Cancelled,
    Timeout,
    Completed,
}

impl ResetReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetReason::Cancelled => "cancelled",
            ResetReason::Timeout => "timeout",
            ResetReason::Completed => "completed",
        }
    }
}

/// Work requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SeedStartBlock { epoch: u64 },
    StartPaymentCountdown { epoch: u64 },
    StartWatcher { epoch: u64, start_block: Option<u64> },
    StopWatcher,
    StopPaymentCountdown,
    StartSuccessCountdown { epoch: u64 },
    StopSuccessCountdown,
    StartMessageTimer { epoch: u64 },
    /// Stop the watcher and every timer.
    Reset(ResetReason),
    ActuateRelay,
    MintReceipt { payer: Address },
    PlaySuccessSound,
}

/// Inputs to the controller's loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StartPayment,
    Cancel,
    StartBlockSeeded {
        epoch: u64,
        result: Result<u64, LedgerError>,
    },
    /// The watcher seeded itself after the initial head read failed.
    StartBlockAdopted { epoch: u64, height: u64 },
    PaymentFound {
        epoch: u64,
        found: TransferMatch,
    },
    PaymentTick { epoch: u64 },
    SuccessTick { epoch: u64 },
    MessageElapsed { epoch: u64 },
    Device(DeviceEvent),
}

impl From<DeviceEvent> for SessionEvent {
    fn from(event: DeviceEvent) -> Self {
        SessionEvent::Device(event)
    }
}

/// The kiosk's single session, reinitialised in place on every reset.
#[derive(Debug, Clone)]
pub struct Session {
    view: View,
    success_phase: SuccessPhase,
    tx_hash: Option<TxHash>,
    time_left_secs: u32,
    success_time_left_secs: u32,
    start_block: Option<u64>,
    epoch: u64,
    status: String,
    payment_timeout_secs: u32,
    success_countdown_secs: u32,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            view: View::Landing,
            success_phase: SuccessPhase::Timer,
            tx_hash: None,
            time_left_secs: config.payment_timeout_secs,
            success_time_left_secs: config.success_countdown_secs,
            start_block: None,
            epoch: 0,
            status: STATUS_IDLE.to_string(),
            payment_timeout_secs: config.payment_timeout_secs,
            success_countdown_secs: config.success_countdown_secs,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn success_phase(&self) -> SuccessPhase {
        self.success_phase
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        self.tx_hash
    }

    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    pub fn success_time_left_secs(&self) -> u32 {
        self.success_time_left_secs
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Enter the payment phase. Only valid from Landing.
    pub fn start_payment(&mut self) -> Vec<Effect> {
        if self.view != View::Landing {
            tracing::debug!(view = ?self.view, "Start ignored outside landing");
            return Vec::new();
        }

        self.view = View::Payment;
        self.time_left_secs = self.payment_timeout_secs;
        self.tx_hash = None;
        self.start_block = None;
        self.status = STATUS_WAITING.to_string();
        let epoch = self.advance_epoch();

        tracing::info!(epoch, timeout_secs = self.time_left_secs, "Payment session started");

        vec![
            Effect::SeedStartBlock { epoch },
            Effect::StartPaymentCountdown { epoch },
        ]
    }

    /// User cancel, also the "Done" action on the success screen.
    pub fn cancel(&mut self) -> Vec<Effect> {
        match self.view {
            View::Landing => Vec::new(),
            View::Payment | View::Success => self.reset(ResetReason::Cancelled),
        }
    }

    /// Result of reading the head when the payment phase began.
    pub fn seed_start_block(&mut self, epoch: u64, result: Result<u64, LedgerError>) -> Vec<Effect> {
        if epoch != self.epoch || self.view != View::Payment {
            return Vec::new();
        }

        match result {
            Ok(height) => {
                self.start_block = Some(height);
                vec![Effect::StartWatcher {
                    epoch,
                    start_block: Some(height),
                }]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read ledger head, watcher will seed itself");
                self.status = STATUS_LEDGER_DOWN.to_string();
                vec![Effect::StartWatcher {
                    epoch,
                    start_block: None,
                }]
            }
        }
    }

    /// The watcher read the ledger after a failed seed and adopted `height`.
    pub fn adopt_start_block(&mut self, epoch: u64, height: u64) -> Vec<Effect> {
        if epoch != self.epoch || self.view != View::Payment || self.start_block.is_some() {
            return Vec::new();
        }

        tracing::info!(start_block = height, "Ledger reachable again");
        self.start_block = Some(height);
        self.status = STATUS_WAITING.to_string();
        Vec::new()
    }

    /// The watcher found the payment.
    pub fn confirm_payment(&mut self, epoch: u64, found: &TransferMatch) -> Vec<Effect> {
        if epoch != self.epoch || self.view != View::Payment {
            tracing::debug!(tx_hash = %found.tx_hash, "Ignoring stale payment match");
            return Vec::new();
        }

        self.tx_hash = Some(found.tx_hash);
        self.view = View::Success;
        self.success_phase = SuccessPhase::Timer;
        self.success_time_left_secs = self.success_countdown_secs;
        self.start_block = None;
        self.status = STATUS_CONFIRMED.to_string();
        let epoch = self.advance_epoch();

        tracing::info!(tx_hash = %found.tx_hash, payer = %found.payer, "Payment confirmed");

        vec![
            Effect::StopWatcher,
            Effect::StopPaymentCountdown,
            Effect::StartSuccessCountdown { epoch },
            Effect::ActuateRelay,
            Effect::MintReceipt { payer: found.payer },
            Effect::PlaySuccessSound,
        ]
    }

    /// One second of the payment countdown. Zero times out the session.
    pub fn payment_tick(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.epoch || self.view != View::Payment {
            return Vec::new();
        }

        self.time_left_secs = self.time_left_secs.saturating_sub(1);
        if self.time_left_secs == 0 {
            tracing::info!("Payment window expired");
            return self.reset(ResetReason::Timeout);
        }
        Vec::new()
    }

    /// One second of the success countdown. Zero flips to the message phase.
    pub fn success_tick(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.epoch
            || self.view != View::Success
            || self.success_phase != SuccessPhase::Timer
        {
            return Vec::new();
        }

        self.success_time_left_secs = self.success_time_left_secs.saturating_sub(1);
        if self.success_time_left_secs > 0 {
            return Vec::new();
        }

        self.success_phase = SuccessPhase::Message;
        self.status = STATUS_THANK_YOU.to_string();
        let epoch = self.advance_epoch();
        vec![
            Effect::StopSuccessCountdown,
            Effect::StartMessageTimer { epoch },
        ]
    }

    /// The thank-you message has been shown long enough.
    pub fn message_elapsed(&mut self, epoch: u64) -> Vec<Effect> {
        if epoch != self.epoch
            || self.view != View::Success
            || self.success_phase != SuccessPhase::Message
        {
            return Vec::new();
        }
        self.reset(ResetReason::Completed)
    }

    /// Hardware start button. Honoured only on the landing screen.
    pub fn button_pressed(&mut self) -> Vec<Effect> {
        if self.view != View::Landing {
            tracing::debug!(view = ?self.view, "Button press ignored");
            return Vec::new();
        }
        self.start_payment()
    }

    /// Shared path back to Landing.
    fn reset(&mut self, reason: ResetReason) -> Vec<Effect> {
        self.view = View::Landing;
        self.success_phase = SuccessPhase::Timer;
        self.tx_hash = None;
        self.start_block = None;
        self.time_left_secs = self.payment_timeout_secs;
        self.success_time_left_secs = self.success_countdown_secs;
        self.status = STATUS_IDLE.to_string();
        self.advance_epoch();

        tracing::info!(reason = reason.as_str(), "Session reset");
        vec![Effect::Reset(reason)]
    }

    fn advance_epoch(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }
}
