//! Success chime.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::config::AudioConfig;

/// Plays the success sound. Failures are the implementation's to log.
#[async_trait]
pub trait SuccessSound: Send + Sync {
    async fn play(&self);
}

/// Runs a configured player, e.g. `["aplay", "/usr/share/kiosk/success.wav"]`.
#[derive(Debug, Clone)]
pub struct CommandChime {
    program: String,
    args: Vec<String>,
}

impl CommandChime {
    /// `None` when no command is configured.
    pub fn from_config(config: &AudioConfig) -> Option<Self> {
        let (program, args) = config.command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl SuccessSound for CommandChime {
    async fn play(&self) {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match status {
            Ok(status) if status.success() => tracing::debug!("Success chime played"),
            Ok(status) => tracing::warn!(program = %self.program, %status, "Chime player failed"),
            Err(e) => tracing::warn!(program = %self.program, error = %e, "Failed to start chime player"),
        }
    }
}

/// No sound output.
#[derive(Debug, Default, Clone)]
pub struct SilentChime;

#[async_trait]
impl SuccessSound for SilentChime {
    async fn play(&self) {
        tracing::debug!("Success chime (silent)");
    }
}
