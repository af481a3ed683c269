//! Serial link actor.
//!
//! # States
//! ```text
//! Disconnected → Connecting → Connected → Disconnected
//!                    │                        │
//!                    └── nothing authorized ──┴── reconnect after delay
//! ```
//!
//! The actor task is the only owner of the port. It multiplexes the request
//! queue, the port reader (armed only while connected), the reconnect
//! deadline and shutdown with `tokio::select!`.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep, sleep_until, Instant};

use crate::config::DeviceConfig;
use crate::device::protocol::{DeviceCommand, DeviceMessage, LineDecoder};
use crate::device::transport::{DevicePort, PortIo, SerialTransport};
use crate::device::types::{ConnectionState, DeviceError, DeviceEvent, DeviceStatus};
use crate::observability::metrics;
use crate::resilience::Backoff;

/// Reads a single record may span before it is dropped as garbage.
const MAX_PARTIAL_READS: usize = 4;

/// Requests queued for the link task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkRequest {
    Send(DeviceCommand),
    Authorize,
}

/// Cloneable front end of a [`DeviceLink`].
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    requests: mpsc::Sender<LinkRequest>,
    status: watch::Receiver<DeviceStatus>,
}

impl DeviceHandle {
    /// A handle with no link behind it; every command is a logged no-op.
    pub fn detached() -> Self {
        let (requests, _) = mpsc::channel(1);
        let (_, status) = watch::channel(DeviceStatus::default());
        Self { requests, status }
    }

    pub fn status(&self) -> DeviceStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceStatus> {
        self.status.clone()
    }

    /// Queue `command` for a single write.
    ///
    /// Never waits: a disconnected link or a full queue drops the command.
    pub fn send_command(&self, command: DeviceCommand) -> Result<(), DeviceError> {
        if self.status().state != ConnectionState::Connected {
            tracing::info!(command = %command, "Device not connected, command skipped");
            metrics::record_device_command("not_connected");
            return Err(DeviceError::NotConnected);
        }

        match self.requests.try_send(LinkRequest::Send(command)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(command = %command, "Device command queue full, command dropped");
                metrics::record_device_command("dropped");
                Err(DeviceError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeviceError::Closed),
        }
    }

    /// Ask the link to authorize a new device. Call from a user action.
    pub fn request_permission(&self) -> Result<(), DeviceError> {
        self.requests
            .try_send(LinkRequest::Authorize)
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeviceError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeviceError::Closed,
            })
    }
}

/// Connection owned by the link task.
///
/// `io` is `Some` iff `state` is `Connected`; only `attach` and `release`
/// change either.
#[derive(Debug, Default)]
struct DeviceConnection {
    state: ConnectionState,
    port: Option<DevicePort>,
    io: Option<PortIo>,
    relay_active: bool,
    needs_permission: bool,
}

impl DeviceConnection {
    fn attach(&mut self, port: DevicePort, io: PortIo) {
        self.state = ConnectionState::Connected;
        self.port = Some(port);
        self.io = Some(io);
        self.needs_permission = false;
    }

    fn release(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.port = None;
        self.io = None;
        self.relay_active = false;
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn status(&self) -> DeviceStatus {
        DeviceStatus {
            state: self.state,
            relay_active: self.relay_active,
            needs_permission: self.needs_permission,
        }
    }
}

/// Serial link to the kiosk's controller board.
pub struct DeviceLink<T, E> {
    transport: T,
    config: DeviceConfig,
    connection: DeviceConnection,
    decoder: LineDecoder,
    requests: mpsc::Receiver<LinkRequest>,
    events: mpsc::UnboundedSender<E>,
    status_tx: watch::Sender<DeviceStatus>,
    reconnect_at: Option<Instant>,
    backoff: Backoff,
}

impl<T, E> DeviceLink<T, E>
where
    T: SerialTransport,
    E: From<DeviceEvent> + Send + 'static,
{
    /// Create the link and its handle. Events go to `events`.
    pub fn new(transport: T, config: DeviceConfig, events: mpsc::UnboundedSender<E>) -> (Self, DeviceHandle) {
        let (requests_tx, requests) = mpsc::channel(config.command_queue_capacity.max(1));
        let (status_tx, status) = watch::channel(DeviceStatus::default());
        let backoff = Backoff::new(
            Duration::from_millis(config.reconnect_delay_ms),
            Duration::from_millis(config.max_reconnect_delay_ms),
        );

        let decoder = LineDecoder::new(config.read_buffer_size.max(1) * MAX_PARTIAL_READS);

        let link = Self {
            transport,
            config,
            connection: DeviceConnection::default(),
            decoder,
            requests,
            events,
            status_tx,
            reconnect_at: None,
            backoff,
        };
        let handle = DeviceHandle {
            requests: requests_tx,
            status,
        };
        (link, handle)
    }

    /// Run until shutdown.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            filters = self.config.filters.len(),
            baud_rate = self.config.baud_rate,
            "Device link starting"
        );
        self.connect_silently().await;

        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];
        let mut requests_open = true;

        loop {
            let reconnect_at = self.reconnect_at;
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Device link received shutdown signal");
                    break;
                }
                request = self.requests.recv(), if requests_open => match request {
                    Some(request) => self.handle_request(request).await,
                    None => requests_open = false,
                },
                read = read_port(&mut self.connection.io, &mut buf), if self.connection.is_connected() => {
                    self.handle_read(read, &buf).await;
                }
                _ = sleep_until(reconnect_at.unwrap_or_else(Instant::now)), if reconnect_at.is_some() => {
                    self.reconnect_at = None;
                    self.connect_silently().await;
                }
            }
        }

        self.connection.release();
        self.publish();
    }

    async fn handle_request(&mut self, request: LinkRequest) {
        match request {
            LinkRequest::Send(command) => self.write_command(command).await,
            LinkRequest::Authorize => self.authorize().await,
        }
    }

    /// Reconnect using already-authorized devices only.
    async fn connect_silently(&mut self) {
        self.set_state(ConnectionState::Connecting);

        match self.transport.list_authorized_devices(&self.config.filters).await {
            Ok(ports) => match ports.into_iter().next() {
                Some(port) => self.open(port).await,
                None => {
                    tracing::info!("No authorized device found, waiting for permission");
                    self.connection.needs_permission = true;
                    self.set_state(ConnectionState::Disconnected);
                    self.schedule_retry();
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Listing serial devices failed");
                self.set_state(ConnectionState::Disconnected);
                self.schedule_retry();
            }
        }
    }

    async fn authorize(&mut self) {
        if self.connection.is_connected() {
            tracing::debug!("Authorization requested while connected, ignoring");
            return;
        }

        match self
            .transport
            .request_device_authorization(&self.config.filters)
            .await
        {
            Ok(port) => self.open(port).await,
            Err(DeviceError::PermissionRequired) => {
                tracing::info!("Device authorization declined or no device present");
                self.connection.needs_permission = true;
                self.publish();
            }
            Err(e) => tracing::warn!(error = %e, "Device authorization failed"),
        }
    }

    async fn open(&mut self, port: DevicePort) {
        self.set_state(ConnectionState::Connecting);

        match self.transport.open(&port, self.config.baud_rate).await {
            Ok(io) => {
                tracing::info!(
                    path = %port.path,
                    vendor_id = format_args!("{:04x}", port.vendor_id),
                    product_id = format_args!("{:04x}", port.product_id),
                    "Device connected"
                );
                self.decoder.clear();
                self.connection.attach(port, io);
                self.backoff.reset();
                self.reconnect_at = None;
                self.publish();
            }
            Err(e) => {
                tracing::warn!(path = %port.path, error = %e, "Opening device failed");
                self.set_state(ConnectionState::Disconnected);
                self.schedule_retry();
            }
        }
    }

    async fn handle_read(&mut self, read: std::io::Result<usize>, buf: &[u8]) {
        match read {
            Ok(0) => self.handle_disconnect("port closed"),
            Ok(n) => {
                for line in self.decoder.push(&buf[..n]) {
                    self.dispatch(&line);
                }
                read_pause(self.config.read_pause_ms).await;
            }
            Err(e) => self.handle_disconnect(&format!("read failed: {}", e)),
        }
    }

    fn dispatch(&mut self, line: &str) {
        match DeviceMessage::parse(line) {
            DeviceMessage::ButtonPressed => {
                tracing::info!("Start button pressed");
                self.emit(DeviceEvent::ButtonPressed);
            }
            DeviceMessage::RelayOnOk => {
                self.connection.relay_active = true;
                self.publish();
            }
            DeviceMessage::RelayAutoOff => {
                self.connection.relay_active = false;
                self.publish();
            }
            DeviceMessage::Unknown(other) => {
                tracing::debug!(line = %other, "Ignoring unknown device line");
            }
        }
    }

    async fn write_command(&mut self, command: DeviceCommand) {
        let Some(io) = self.connection.io.as_mut() else {
            tracing::info!(command = %command, "Device disconnected before send, command dropped");
            metrics::record_device_command("not_connected");
            return;
        };

        let bytes = command.encode();
        let result = async {
            io.writer.write_all(&bytes).await?;
            io.writer.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!(command = %command, "Device command sent");
                metrics::record_device_command("sent");
            }
            Err(e) => {
                metrics::record_device_command("failed");
                self.handle_disconnect(&format!("write failed: {}", e));
            }
        }
    }

    /// Tear down the port and schedule one reconnect attempt.
    fn handle_disconnect(&mut self, reason: &str) {
        tracing::warn!(reason, "Device disconnected");
        self.connection.release();
        self.decoder.clear();
        self.publish();

        self.backoff.reset();
        self.reconnect_at =
            Some(Instant::now() + Duration::from_millis(self.config.reconnect_delay_ms));
    }

    fn schedule_retry(&mut self) {
        let delay = self.backoff.next_delay();
        tracing::debug!(retry_in_ms = delay.as_millis() as u64, "Device reconnect scheduled");
        self.reconnect_at = Some(Instant::now() + delay);
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.connection.state = state;
        self.publish();
    }

    /// Publish the current status and emit events for whatever changed.
    fn publish(&mut self) {
        let status = self.connection.status();
        let previous = self.status_tx.send_replace(status);

        if previous.relay_active != status.relay_active {
            self.emit(DeviceEvent::RelayChanged(status.relay_active));
        }
        if previous.state != status.state || previous.needs_permission != status.needs_permission {
            metrics::record_device_connected(status.state == ConnectionState::Connected);
            self.emit(DeviceEvent::ConnectionChanged(status));
        }
    }

    fn emit(&self, event: DeviceEvent) {
        // The owner may already be gone during shutdown.
        let _ = self.events.send(E::from(event));
    }
}

/// Let timers and poll ticks run between read passes.
async fn read_pause(pause_ms: u64) {
    if pause_ms == 0 {
        tokio::task::yield_now().await;
    } else {
        sleep(Duration::from_millis(pause_ms)).await;
    }
}

async fn read_port(io: &mut Option<PortIo>, buf: &mut [u8]) -> std::io::Result<usize> {
    match io {
        Some(io) => io.reader.read(buf).await,
        None => std::future::pending().await,
    }
}
