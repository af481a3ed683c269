//! Serial peripheral subsystem.
//!
//! # Data Flow
//! ```text
//! transport.rs (enumerate / authorize / open)
//!     → link.rs (connection owner, reconnect, read loop)
//!     → protocol.rs (line decoding, tokens)
//!     → DeviceEvent into the session controller's channel
//!
//! DeviceHandle::send_command
//!     → bounded queue → link.rs single write
//! ```

pub mod link;
pub mod protocol;
pub mod transport;
pub mod types;

pub use link::{DeviceHandle, DeviceLink};
pub use protocol::{DeviceCommand, DeviceMessage, LineDecoder};
pub use transport::{DevicePort, PortIo, SerialTransport, TokioSerialTransport};
pub use types::{ConnectionState, DeviceError, DeviceEvent, DeviceStatus};
