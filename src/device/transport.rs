//! Serial transport abstraction and its `tokio-serial` implementation.

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPortBuilderExt, SerialPortType};

use crate::config::UsbFilter;
use crate::device::types::DeviceError;

/// An enumerated serial device. Opaque to everything but the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevicePort {
    pub path: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub product: Option<String>,
}

impl DevicePort {
    pub fn matches(&self, filters: &[UsbFilter]) -> bool {
        filters
            .iter()
            .any(|f| f.vendor_id == self.vendor_id && f.product_id == self.product_id)
    }
}

/// Reader and writer halves of an open port.
pub struct PortIo {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl PortIo {
    /// Split a bidirectional stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

impl std::fmt::Debug for PortIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortIo").finish_non_exhaustive()
    }
}

/// Platform access to serial devices.
///
/// A disconnect is observed by the reader returning EOF or an error.
#[async_trait]
pub trait SerialTransport: Send + Sync {
    /// Devices matching `filters` that may be opened without user interaction.
    async fn list_authorized_devices(
        &self,
        filters: &[UsbFilter],
    ) -> Result<Vec<DevicePort>, DeviceError>;

    /// Authorize a new device. Only call this from a user-initiated action.
    async fn request_device_authorization(
        &self,
        filters: &[UsbFilter],
    ) -> Result<DevicePort, DeviceError>;

    /// Open `port` at `baud_rate`.
    async fn open(&self, port: &DevicePort, baud_rate: u32) -> Result<PortIo, DeviceError>;
}

/// Native serial ports via `tokio-serial`.
///
/// A native host has no per-device permission prompt, so every enumerated
/// USB port on the allow-list counts as authorized.
#[derive(Debug, Default, Clone)]
pub struct TokioSerialTransport;

impl TokioSerialTransport {
    pub fn new() -> Self {
        Self
    }

    /// Every USB serial port on the host, matching or not.
    pub async fn enumerate() -> Result<Vec<DevicePort>, DeviceError> {
        let ports = tokio::task::spawn_blocking(tokio_serial::available_ports)
            .await
            .map_err(|e| DeviceError::Connection(format!("port enumeration panicked: {}", e)))?
            .map_err(|e| DeviceError::Connection(e.to_string()))?;

        Ok(ports
            .into_iter()
            .filter_map(|port| match port.port_type {
                SerialPortType::UsbPort(info) => Some(DevicePort {
                    path: port.port_name,
                    vendor_id: info.vid,
                    product_id: info.pid,
                    product: info.product,
                }),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl SerialTransport for TokioSerialTransport {
    async fn list_authorized_devices(
        &self,
        filters: &[UsbFilter],
    ) -> Result<Vec<DevicePort>, DeviceError> {
        let ports = Self::enumerate().await?;
        Ok(ports.into_iter().filter(|p| p.matches(filters)).collect())
    }

    async fn request_device_authorization(
        &self,
        filters: &[UsbFilter],
    ) -> Result<DevicePort, DeviceError> {
        self.list_authorized_devices(filters)
            .await?
            .into_iter()
            .next()
            .ok_or(DeviceError::PermissionRequired)
    }

    async fn open(&self, port: &DevicePort, baud_rate: u32) -> Result<PortIo, DeviceError> {
        let stream = tokio_serial::new(&port.path, baud_rate)
            .open_native_async()
            .map_err(|e| DeviceError::Connection(format!("{}: {}", port.path, e)))?;
        Ok(PortIo::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(vendor_id: u16, product_id: u16) -> DevicePort {
        DevicePort {
            path: "/dev/ttyACM0".to_string(),
            vendor_id,
            product_id,
            product: None,
        }
    }

    #[test]
    fn test_port_matches_filters() {
        let filters = [UsbFilter {
            vendor_id: 0x2341,
            product_id: 0x0043,
        }];
        assert!(port(0x2341, 0x0043).matches(&filters));
        assert!(!port(0x2341, 0x0042).matches(&filters));
        assert!(!port(0x2341, 0x0043).matches(&[]));
    }

    #[tokio::test]
    async fn test_port_io_splits_duplex() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (ours, mut theirs) = tokio::io::duplex(64);
        let mut io = PortIo::new(ours);

        io.writer.write_all(b"RELAY_ON\n").await.unwrap();
        let mut buf = [0u8; 9];
        theirs.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"RELAY_ON\n");

        theirs.write_all(b"OK\n").await.unwrap();
        let mut buf = [0u8; 3];
        io.reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"OK\n");
    }
}
