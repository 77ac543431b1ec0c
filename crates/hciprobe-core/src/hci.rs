//! Bluetooth HCI packets over UART (H4 transport)
//!
//! Only what is needed to build the version query and to read its reply:
//! command packets, the Command Complete / Command Status events, and the
//! Read Local Version Information return parameters.
//!
//! Multi-byte HCI fields are little-endian on the wire.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use std::fmt;

use crate::protocol::ProtocolError;

/// H4 packet indicator for commands
pub const PACKET_COMMAND: u8 = 0x01;

/// H4 packet indicator for events
pub const PACKET_EVENT: u8 = 0x04;

/// Event code: Command Complete
pub const EVENT_COMMAND_COMPLETE: u8 = 0x0E;

/// Event code: Command Status
pub const EVENT_COMMAND_STATUS: u8 = 0x0F;

/// HCI commands this tool knows how to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HciCommand {
    /// Informational parameters: Read Local Version Information
    ReadLocalVersionInformation,
    /// Controller and baseband: Reset
    Reset,
}

impl HciCommand {
    /// OGF/OCF packed opcode
    pub fn opcode(self) -> u16 {
        match self {
            HciCommand::ReadLocalVersionInformation => 0x1001,
            HciCommand::Reset => 0x0C03,
        }
    }

    /// Full H4 command packet with an empty parameter block
    pub fn to_packet(self) -> Vec<u8> {
        let mut packet = vec![PACKET_COMMAND, 0, 0, 0];
        LittleEndian::write_u16(&mut packet[1..3], self.opcode());
        packet
    }
}

/// Parameters of a Command Complete event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandComplete {
    /// Number of command packets the controller will accept now
    pub num_hci_command_packets: u8,
    /// Opcode of the completed command
    pub opcode: u16,
    /// HCI status code; 0 is success
    pub status: u8,
    /// Command specific return parameters following the status
    pub return_params: Vec<u8>,
}

/// A decoded event packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HciEvent {
    /// Command executed immediately
    CommandComplete(CommandComplete),
    /// Command accepted for later completion
    #[allow(missing_docs)]
    CommandStatus {
        status: u8,
        num_hci_command_packets: u8,
        opcode: u16,
    },
    /// Any event this tool does not interpret
    #[allow(missing_docs)]
    Other { code: u8, params: Vec<u8> },
}

fn invalid(msg: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidResponse(msg.into())
}

impl HciEvent {
    /// Parse an H4 event packet. Bytes past the declared length are ignored.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let (&indicator, rest) = data
            .split_first()
            .ok_or_else(|| invalid("empty reply"))?;
        if indicator != PACKET_EVENT {
            return Err(invalid(format!(
                "expected event packet 0x{:02x}, got 0x{:02x}",
                PACKET_EVENT, indicator
            )));
        }
        if rest.len() < 2 {
            return Err(invalid("truncated event header"));
        }

        let code = rest[0];
        let declared = rest[1] as usize;
        let body = &rest[2..];
        if body.len() < declared {
            return Err(invalid(format!(
                "event declares {} parameter bytes, only {} received",
                declared,
                body.len()
            )));
        }
        let params = &body[..declared];

        match code {
            EVENT_COMMAND_COMPLETE => {
                if params.len() < 4 {
                    return Err(invalid("Command Complete shorter than 4 bytes"));
                }
                Ok(HciEvent::CommandComplete(CommandComplete {
                    num_hci_command_packets: params[0],
                    opcode: LittleEndian::read_u16(&params[1..3]),
                    status: params[3],
                    return_params: params[4..].to_vec(),
                }))
            }
            EVENT_COMMAND_STATUS => {
                if params.len() < 4 {
                    return Err(invalid("Command Status shorter than 4 bytes"));
                }
                Ok(HciEvent::CommandStatus {
                    status: params[0],
                    num_hci_command_packets: params[1],
                    opcode: LittleEndian::read_u16(&params[2..4]),
                })
            }
            _ => Ok(HciEvent::Other {
                code,
                params: params.to_vec(),
            }),
        }
    }
}

/// Controller vendor, identified by its Bluetooth SIG company identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Vendor {
    /// Company id 0x000D
    TexasInstruments,
    /// Company id 0x0030
    StMicroelectronics,
    /// Any other company id
    Unknown(u16),
}

impl Vendor {
    /// Map a manufacturer id onto a known vendor
    pub fn from_manufacturer_id(id: u16) -> Self {
        match id {
            0x000D => Vendor::TexasInstruments,
            0x0030 => Vendor::StMicroelectronics,
            other => Vendor::Unknown(other),
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vendor::TexasInstruments => f.write_str("Texas Instruments"),
            Vendor::StMicroelectronics => f.write_str("STMicroelectronics"),
            Vendor::Unknown(id) => write!(f, "unknown (0x{:04x})", id),
        }
    }
}

/// Return parameters of Read Local Version Information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct LocalVersionInfo {
    pub hci_version: u8,
    pub hci_revision: u16,
    pub lmp_version: u8,
    pub manufacturer_id: u16,
    pub lmp_subversion: u16,
    pub vendor: Vendor,
}

impl LocalVersionInfo {
    /// Size of the return parameter block after the status byte
    pub const LEN: usize = 8;

    /// Decode the return parameters that follow the status byte
    pub fn from_return_params(params: &[u8]) -> Result<Self, ProtocolError> {
        if params.len() < Self::LEN {
            return Err(invalid(format!(
                "version information needs {} bytes, got {}",
                Self::LEN,
                params.len()
            )));
        }
        let manufacturer_id = LittleEndian::read_u16(&params[4..6]);
        Ok(Self {
            hci_version: params[0],
            hci_revision: LittleEndian::read_u16(&params[1..3]),
            lmp_version: params[3],
            manufacturer_id,
            lmp_subversion: LittleEndian::read_u16(&params[6..8]),
            vendor: Vendor::from_manufacturer_id(manufacturer_id),
        })
    }
}

impl fmt::Display for LocalVersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "HCI version:     0x{:02x} rev 0x{:04x}", self.hci_version, self.hci_revision)?;
        writeln!(f, "LMP version:     0x{:02x} sub 0x{:04x}", self.lmp_version, self.lmp_subversion)?;
        write!(f, "Manufacturer id: 0x{:04x} ({})", self.manufacturer_id, self.vendor)
    }
}

/// Interpret a raw reply as the answer to Read Local Version Information
pub fn decode_local_version(reply: &[u8]) -> Result<LocalVersionInfo, ProtocolError> {
    let expected = HciCommand::ReadLocalVersionInformation.opcode();
    match HciEvent::parse(reply)? {
        HciEvent::CommandComplete(cc) => {
            if cc.opcode != expected {
                return Err(invalid(format!(
                    "Command Complete for opcode 0x{:04x}, expected 0x{:04x}",
                    cc.opcode, expected
                )));
            }
            if cc.status != 0 {
                return Err(invalid(format!(
                    "controller returned status 0x{:02x}",
                    cc.status
                )));
            }
            LocalVersionInfo::from_return_params(&cc.return_params)
        }
        HciEvent::CommandStatus { status, opcode, .. } => Err(invalid(format!(
            "Command Status 0x{:02x} for opcode 0x{:04x}",
            status, opcode
        ))),
        HciEvent::Other { code, .. } => Err(invalid(format!("unexpected event 0x{:02x}", code))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::REQUEST_FRAME;

    // Command Complete for 0x1001 from a CC2540 network processor
    const TI_REPLY: [u8; 15] = [
        0x04, 0x0e, 0x0c, 0x01, 0x01, 0x10, 0x00, 0x06, 0x00, 0x00, 0x06, 0x0d, 0x00, 0x00,
        0x00,
    ];

    #[test]
    fn test_request_frame_is_version_query() {
        assert_eq!(
            HciCommand::ReadLocalVersionInformation.to_packet(),
            REQUEST_FRAME.to_vec()
        );
        assert_eq!(HciCommand::Reset.to_packet(), vec![0x01, 0x03, 0x0c, 0x00]);
    }

    #[test]
    fn test_decode_ti_version() {
        let info = decode_local_version(&TI_REPLY).unwrap();
        assert_eq!(info.hci_version, 0x06);
        assert_eq!(info.lmp_version, 0x06);
        assert_eq!(info.manufacturer_id, 0x000d);
        assert_eq!(info.vendor, Vendor::TexasInstruments);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut reply = TI_REPLY.to_vec();
        reply.extend_from_slice(&[0xff, 0xff]);
        assert!(decode_local_version(&reply).is_ok());
    }

    #[test]
    fn test_truncated_event() {
        assert!(HciEvent::parse(&TI_REPLY[..10]).is_err());
        assert!(HciEvent::parse(&[0x04]).is_err());
        assert!(HciEvent::parse(&[]).is_err());
    }

    #[test]
    fn test_not_an_event() {
        let err = HciEvent::parse(&[0xaa, 0xbb]).unwrap_err();
        assert!(err.to_string().contains("expected event packet"));
    }

    #[test]
    fn test_command_status() {
        let event = HciEvent::parse(&[0x04, 0x0f, 0x04, 0x01, 0x01, 0x01, 0x10]).unwrap();
        assert_eq!(
            event,
            HciEvent::CommandStatus {
                status: 0x01,
                num_hci_command_packets: 0x01,
                opcode: 0x1001,
            }
        );
        assert!(decode_local_version(&[0x04, 0x0f, 0x04, 0x01, 0x01, 0x01, 0x10]).is_err());
    }

    #[test]
    fn test_failed_status() {
        let reply = [0x04, 0x0e, 0x04, 0x01, 0x01, 0x10, 0x01];
        let err = decode_local_version(&reply).unwrap_err();
        assert!(err.to_string().contains("status 0x01"));
    }

    #[test]
    fn test_vendor_names() {
        assert_eq!(Vendor::from_manufacturer_id(0x30), Vendor::StMicroelectronics);
        assert_eq!(Vendor::from_manufacturer_id(0x02).to_string(), "unknown (0x0002)");
    }
}
