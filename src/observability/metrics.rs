//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kiosk_chain_polls_total` (counter): watcher ticks by outcome
//! - `kiosk_payments_confirmed_total` (counter): confirmed payments
//! - `kiosk_session_resets_total` (counter): resets by reason
//! - `kiosk_device_connected` (gauge): 1=connected, 0=not
//! - `kiosk_device_commands_total` (counter): commands by outcome
//! - `kiosk_receipt_mints_total` (counter): mint attempts by outcome

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_chain_poll(outcome: &'static str) {
    counter!("kiosk_chain_polls_total", "outcome" => outcome).increment(1);
}

pub fn record_payment_confirmed() {
    counter!("kiosk_payments_confirmed_total").increment(1);
}

pub fn record_session_reset(reason: &'static str) {
    counter!("kiosk_session_resets_total", "reason" => reason).increment(1);
}

pub fn record_device_connected(connected: bool) {
    gauge!("kiosk_device_connected").set(if connected { 1.0 } else { 0.0 });
}

pub fn record_device_command(outcome: &'static str) {
    counter!("kiosk_device_commands_total", "outcome" => outcome).increment(1);
}

pub fn record_receipt_mint(outcome: &'static str) {
    counter!("kiosk_receipt_mints_total", "outcome" => outcome).increment(1);
}
