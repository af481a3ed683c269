//! Session controller task.
//!
//! The controller is the only writer of the [`Session`]. Every asynchronous
//! source (countdowns, the watcher, the start-block seed, the device link,
//! user input) reaches it as a [`SessionEvent`] on one channel.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

use crate::audio::SuccessSound;
use crate::blockchain::LedgerReader;
use crate::config::SessionConfig;
use crate::device::{ConnectionState, DeviceCommand, DeviceError, DeviceEvent, DeviceHandle, DeviceStatus};
use crate::minting::{MintError, ReceiptMinter};
use crate::observability::metrics;
use crate::session::state::{Effect, Session, SessionEvent, SuccessPhase, View};
use crate::session::timers::{self, TaskSlot};
use crate::watcher::{ChainWatcher, MatchRule, WatcherSettings};

const TICK: Duration = Duration::from_secs(1);

/// Read-only view of the kiosk for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub view: View,
    pub success_phase: SuccessPhase,
    pub time_left_secs: u32,
    pub success_time_left_secs: u32,
    pub tx_hash: Option<TxHash>,
    pub relay_active: bool,
    pub device_state: ConnectionState,
    pub needs_permission: bool,
    pub status: String,
    pub payment_uri: String,
}

impl DisplayState {
    fn capture(session: &Session, device: &DeviceStatus, payment_uri: &str) -> Self {
        Self {
            view: session.view(),
            success_phase: session.success_phase(),
            time_left_secs: session.time_left_secs(),
            success_time_left_secs: session.success_time_left_secs(),
            tx_hash: session.tx_hash(),
            relay_active: device.relay_active,
            device_state: device.state,
            needs_permission: device.needs_permission,
            status: session.status().to_string(),
            payment_uri: payment_uri.to_string(),
        }
    }
}

/// Side-effect collaborators of the controller.
pub struct Collaborators {
    pub ledger: Arc<dyn LedgerReader>,
    pub minter: Arc<dyn ReceiptMinter>,
    pub chime: Arc<dyn SuccessSound>,
}

/// Write side for the presentation layer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    display: watch::Receiver<DisplayState>,
    device: DeviceHandle,
}

impl SessionHandle {
    pub fn start_payment(&self) {
        self.send(SessionEvent::StartPayment);
    }

    pub fn cancel(&self) {
        self.send(SessionEvent::Cancel);
    }

    /// Ask the device link to authorize a device. Call from a user action.
    pub fn request_device_permission(&self) -> Result<(), DeviceError> {
        self.device.request_permission()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }

    pub fn snapshot(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    fn send(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Session controller stopped, input ignored");
        }
    }
}

/// Owns the session and runs its effects.
pub struct SessionController {
    session: Session,
    rule: MatchRule,
    watcher_settings: WatcherSettings,
    message_duration: Duration,
    payment_uri: String,
    collaborators: Collaborators,
    device: DeviceHandle,
    device_status: DeviceStatus,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    display: watch::Sender<DisplayState>,
    payment_countdown: TaskSlot,
    success_countdown: TaskSlot,
    message_timer: TaskSlot,
    watcher: TaskSlot,
}

impl SessionController {
    pub fn new(
        config: &SessionConfig,
        rule: MatchRule,
        watcher_settings: WatcherSettings,
        payment_uri: String,
        collaborators: Collaborators,
    ) -> Self {
        let session = Session::new(config);
        let device_status = DeviceStatus::default();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (display, _) = watch::channel(DisplayState::capture(&session, &device_status, &payment_uri));

        Self {
            session,
            rule,
            watcher_settings,
            message_duration: Duration::from_secs(config.message_duration_secs),
            payment_uri,
            collaborators,
            device: DeviceHandle::detached(),
            device_status,
            events_tx,
            events_rx,
            display,
            payment_countdown: TaskSlot::new("payment_countdown"),
            success_countdown: TaskSlot::new("success_countdown"),
            message_timer: TaskSlot::new("message_timer"),
            watcher: TaskSlot::new("watcher"),
        }
    }

    /// Sender for event sources such as the device link.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Route relay commands and permission requests to `device`.
    pub fn attach_device(&mut self, device: DeviceHandle) {
        self.device_status = device.status();
        self.device = device;
        self.publish();
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            events: self.events_tx.clone(),
            display: self.display.subscribe(),
            device: self.device.clone(),
        }
    }

    /// Run until shutdown. All timers are stopped on exit.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            merchant = %self.rule.merchant(),
            payment_uri = %self.payment_uri,
            "Session controller started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Session controller received shutdown signal");
                    break;
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }

        self.stop_all();
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let effects = match event {
            SessionEvent::StartPayment => self.session.start_payment(),
            SessionEvent::Cancel => self.session.cancel(),
            SessionEvent::StartBlockSeeded { epoch, result } => {
                self.session.seed_start_block(epoch, result)
            }
            SessionEvent::StartBlockAdopted { epoch, height } => {
                self.session.adopt_start_block(epoch, height)
            }
            SessionEvent::PaymentFound { epoch, found } => {
                let effects = self.session.confirm_payment(epoch, &found);
                if !effects.is_empty() {
                    metrics::record_payment_confirmed();
                }
                effects
            }
            SessionEvent::PaymentTick { epoch } => self.session.payment_tick(epoch),
            SessionEvent::SuccessTick { epoch } => self.session.success_tick(epoch),
            SessionEvent::MessageElapsed { epoch } => self.session.message_elapsed(epoch),
            SessionEvent::Device(DeviceEvent::ButtonPressed) => self.session.button_pressed(),
            SessionEvent::Device(DeviceEvent::RelayChanged(active)) => {
                self.device_status.relay_active = active;
                Vec::new()
            }
            SessionEvent::Device(DeviceEvent::ConnectionChanged(status)) => {
                self.device_status = status;
                Vec::new()
            }
        };

        for effect in effects {
            self.execute(effect);
        }
        self.publish();
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::SeedStartBlock { epoch } => {
                let ledger = Arc::clone(&self.collaborators.ledger);
                let events = self.events_tx.clone();
                // Shares the watcher slot so a reset also drops a pending seed.
                self.watcher.arm(tokio::spawn(async move {
                    let result = ledger.current_height().await;
                    let _ = events.send(SessionEvent::StartBlockSeeded { epoch, result });
                }));
            }
            Effect::StartPaymentCountdown { epoch } => {
                self.payment_countdown.arm(timers::every(
                    TICK,
                    self.events_tx.clone(),
                    SessionEvent::PaymentTick { epoch },
                ));
            }
            Effect::StartWatcher { epoch, start_block } => {
                let mut watcher = ChainWatcher::new(
                    Arc::clone(&self.collaborators.ledger),
                    self.rule.clone(),
                    self.watcher_settings.clone(),
                    start_block,
                );
                if start_block.is_none() {
                    let events = self.events_tx.clone();
                    watcher = watcher.on_seeded(move |height| {
                        let _ = events.send(SessionEvent::StartBlockAdopted { epoch, height });
                    });
                }
                let events = self.events_tx.clone();
                self.watcher.arm(tokio::spawn(async move {
                    let found = watcher.run().await;
                    let _ = events.send(SessionEvent::PaymentFound { epoch, found });
                }));
            }
            Effect::StopWatcher => self.watcher.stop(),
            Effect::StopPaymentCountdown => self.payment_countdown.stop(),
            Effect::StartSuccessCountdown { epoch } => {
                self.success_countdown.arm(timers::every(
                    TICK,
                    self.events_tx.clone(),
                    SessionEvent::SuccessTick { epoch },
                ));
            }
            Effect::StopSuccessCountdown => self.success_countdown.stop(),
            Effect::StartMessageTimer { epoch } => {
                self.message_timer.arm(timers::after(
                    self.message_duration,
                    self.events_tx.clone(),
                    SessionEvent::MessageElapsed { epoch },
                ));
            }
            Effect::Reset(reason) => {
                metrics::record_session_reset(reason.as_str());
                self.stop_all();
            }
            Effect::ActuateRelay => {
                if let Err(e) = self.device.send_command(DeviceCommand::RelayOn) {
                    tracing::info!(error = %e, "Relay command not sent");
                }
            }
            Effect::MintReceipt { payer } => self.spawn_mint(self.rule.merchant(), payer),
            Effect::PlaySuccessSound => {
                let chime = Arc::clone(&self.collaborators.chime);
                tokio::spawn(async move { chime.play().await });
            }
        }
    }

    fn spawn_mint(&self, merchant: Address, payer: Address) {
        let minter = Arc::clone(&self.collaborators.minter);
        tokio::spawn(async move {
            match minter.mint_receipt(merchant, payer).await {
                Ok(tx_hash) => tracing::info!(tx_hash = %tx_hash, "Receipt minted"),
                Err(MintError::Disabled) => {}
                Err(e) => tracing::warn!(error = %e, payer = %payer, "Receipt mint failed"),
            }
        });
    }

    fn stop_all(&mut self) {
        self.watcher.stop();
        self.payment_countdown.stop();
        self.success_countdown.stop();
        self.message_timer.stop();
    }

    fn publish(&self) {
        let next = DisplayState::capture(&self.session, &self.device_status, &self.payment_uri);
        self.display.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}
