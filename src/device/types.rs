//! Device link state, events and errors.

use serde::Serialize;
use thiserror::Error;

/// Serial connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Snapshot published by the link after every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceStatus {
    pub state: ConnectionState,
    pub relay_active: bool,
    /// No authorized device was found; a user gesture must authorize one.
    pub needs_permission: bool,
}

/// What the link reports to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    /// The kiosk's start button was pressed.
    ButtonPressed,
    /// The peripheral echoed a relay state change.
    RelayChanged(bool),
    /// Connection state or permission flag changed.
    ConnectionChanged(DeviceStatus),
}

/// Errors that can occur on the serial link.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Open, read or write failed on the port.
    #[error("Serial connection error: {0}")]
    Connection(String),

    /// No allow-listed device is authorized yet.
    #[error("No authorized device; user permission required")]
    PermissionRequired,

    /// Command dropped because the link is down.
    #[error("Device not connected")]
    NotConnected,

    /// Command dropped because the queue is full.
    #[error("Device command queue full")]
    QueueFull,

    /// The link task has exited.
    #[error("Device link closed")]
    Closed,
}

impl From<std::io::Error> for DeviceError {
    fn from(e: std::io::Error) -> Self {
        DeviceError::Connection(e.to_string())
    }
}
