//! Console front end.
//!
//! Logs every display change and maps input lines onto the session handle:
//!
//! | Input       | Action                        |
//! |-------------|-------------------------------|
//! | `pay`       | start a payment session       |
//! | `cancel`    | cancel / done                 |
//! | `authorize` | authorize a serial device     |
//! | `status`    | print the current state       |

use std::io::BufRead;
use tokio::sync::{broadcast, mpsc};

use crate::session::{DisplayState, SessionHandle, View};

/// A recognised console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Pay,
    Cancel,
    Authorize,
    Status,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "pay" | "start" => Some(ConsoleCommand::Pay),
            "cancel" | "done" => Some(ConsoleCommand::Cancel),
            "authorize" | "connect" => Some(ConsoleCommand::Authorize),
            "status" => Some(ConsoleCommand::Status),
            _ => None,
        }
    }
}

pub struct ConsolePresenter {
    handle: SessionHandle,
}

impl ConsolePresenter {
    pub fn new(handle: SessionHandle) -> Self {
        Self { handle }
    }

    /// Run on the process's stdin.
    ///
    /// Lines are read on a detached thread so a pending read never holds up
    /// runtime shutdown.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        self.run_with(rx, shutdown).await;
    }

    /// Run with commands taken from `input`. A closed input stops reading
    /// but keeps logging display changes.
    pub async fn run_with(
        self,
        mut input: mpsc::UnboundedReceiver<String>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut display = self.handle.subscribe();
        let mut input_open = true;

        render(&display.borrow_and_update().clone());

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                changed = display.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = display.borrow_and_update().clone();
                    render(&state);
                }
                line = input.recv(), if input_open => match line {
                    Some(line) => self.dispatch(&line),
                    None => input_open = false,
                },
            }
        }
    }

    fn dispatch(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match ConsoleCommand::parse(line) {
            Some(ConsoleCommand::Pay) => self.handle.start_payment(),
            Some(ConsoleCommand::Cancel) => self.handle.cancel(),
            Some(ConsoleCommand::Authorize) => {
                if let Err(e) = self.handle.request_device_permission() {
                    tracing::warn!(error = %e, "Device authorization request failed");
                }
            }
            Some(ConsoleCommand::Status) => render(&self.handle.snapshot()),
            None => tracing::info!(input = line.trim(), "Unknown command (pay, cancel, authorize, status)"),
        }
    }
}

fn render(state: &DisplayState) {
    match state.view {
        View::Landing => tracing::info!(
            device = ?state.device_state,
            needs_permission = state.needs_permission,
            status = %state.status,
            "Landing"
        ),
        View::Payment => tracing::info!(
            time_left_secs = state.time_left_secs,
            payment_uri = %state.payment_uri,
            status = %state.status,
            "Awaiting payment"
        ),
        View::Success => tracing::info!(
            phase = ?state.success_phase,
            success_time_left_secs = state.success_time_left_secs,
            tx_hash = ?state.tx_hash,
            relay_active = state.relay_active,
            status = %state.status,
            "Payment received"
        ),
    }
}
