//! Line protocol spoken with the controller board.
//!
//! Newline-terminated ASCII tokens in both directions.
//!
//! | Dir | Token              | Meaning                         |
//! |-----|--------------------|---------------------------------|
//! | out | `RELAY_ON`         | actuate the relay               |
//! | in  | `BUTTON_4_PRESSED` | start button pressed            |
//! | in  | `RELAY_ON_OK`      | relay is on                     |
//! | in  | `RELAY_AUTO_OFF`   | relay switched itself off       |

use std::fmt;

/// Commands sent to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    RelayOn,
}

impl DeviceCommand {
    pub fn token(&self) -> &'static str {
        match self {
            DeviceCommand::RelayOn => "RELAY_ON",
        }
    }

    /// Wire form, newline terminated.
    pub fn encode(&self) -> Vec<u8> {
        format!("{}\n", self.token()).into_bytes()
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Lines received from the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    ButtonPressed,
    RelayOnOk,
    RelayAutoOff,
    Unknown(String),
}

impl DeviceMessage {
    /// Parse one trimmed, non-empty line.
    pub fn parse(line: &str) -> Self {
        match line {
            "BUTTON_4_PRESSED" => DeviceMessage::ButtonPressed,
            "RELAY_ON_OK" => DeviceMessage::RelayOnOk,
            "RELAY_AUTO_OFF" => DeviceMessage::RelayAutoOff,
            other => DeviceMessage::Unknown(other.to_string()),
        }
    }
}

/// Splits an inbound byte stream into trimmed, non-empty lines.
///
/// A record cut across two reads is held until its newline arrives. A partial
/// record longer than `max_pending` bytes is discarded.
#[derive(Debug)]
pub struct LineDecoder {
    pending: String,
    max_pending: usize,
}

impl LineDecoder {
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: String::new(),
            max_pending,
        }
    }


    /// Feed a chunk and return the complete lines it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let record: String = self.pending.drain(..=pos).collect();
            let line = record.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }

        if self.pending.len() > self.max_pending {
            tracing::warn!(
                dropped_bytes = self.pending.len(),
                "Unterminated device record too long, discarding"
            );
            self.pending.clear();
        }
        lines
    }

    /// Drop a partial record, e.g. after a disconnect.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
