//! # hciprobe Core Library
//!
//! Core functionality for hciprobe, a probe for UART-attached Bluetooth
//! controllers.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial port discovery and opening (115200 8N1, no flow control)
//! - A single request/response exchange bounded by a read deadline
//! - Hex rendering of the raw reply
//! - Optional decoding of the HCI Read Local Version Information reply
//!
//! ## Example
//!
//! ```rust,ignore
//! use hciprobe_core::protocol::{Connection, ConnectionConfig, REQUEST_FRAME};
//!
//! let mut conn = Connection::open(ConnectionConfig::for_port("/dev/ttyACM0"))?;
//! let response = conn.exchange(&REQUEST_FRAME)?;
//! println!("{}", response);
//! ```

pub mod format;
pub mod hci;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::format::hex_line;
    pub use crate::hci::{decode_local_version, HciCommand, HciEvent, LocalVersionInfo, Vendor};
    pub use crate::protocol::{
        Connection, ConnectionConfig, PortInfo, ProtocolError, Response, Transport,
        REQUEST_FRAME,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
