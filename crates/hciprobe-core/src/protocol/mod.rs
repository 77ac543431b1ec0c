//! Serial Protocol Communication
//!
//! Sends the fixed HCI request frame to a UART-attached controller and
//! collects whatever reply arrives before the read deadline.
//!
//! No framing is imposed on the reply here; see [`crate::hci`] for decoding.

mod connection;
mod error;
pub mod serial;

pub use connection::{Connection, ConnectionConfig, Response, Transport};
pub use error::ProtocolError;
pub use serial::{list_ports, open_port, PortInfo};

/// Default baud rate for the controller UART
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Read deadline in milliseconds for the whole response
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Maximum number of response bytes collected per exchange
pub const MAX_RESPONSE_LEN: usize = 32;

/// HCI Read Local Version Information command packet.
///
/// Packet type `0x01`, opcode `0x1001` (little-endian), no parameters.
pub const REQUEST_FRAME: [u8; 4] = [0x01, 0x01, 0x10, 0x00];
