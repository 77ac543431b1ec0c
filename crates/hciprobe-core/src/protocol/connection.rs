//! Connection management
//!
//! Owns the serial port for the lifetime of one request/response exchange.
//! The port is released when the [`Connection`] is dropped, whichever way
//! the caller leaves its scope.

use serialport::SerialPort;
use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{open_port, ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, MAX_RESPONSE_LEN};
use crate::format::hex_line;

/// Byte transport underneath a [`Connection`].
///
/// Implemented for real serial ports; tests substitute an in-memory peer.
pub trait Transport: Read + Write {
    /// Bound the next blocking read to `timeout`
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl Transport for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_timeout(timeout).map_err(io::Error::from)
    }
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Deadline for the whole response read, in milliseconds
    pub timeout_ms: u64,
    /// Upper bound on collected response bytes
    pub max_response_len: usize,
}

impl ConnectionConfig {
    /// Default configuration for the named port
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_len: MAX_RESPONSE_LEN,
        }
    }
}

/// Raw reply bytes, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    bytes: Vec<u8>,
}

impl Response {
    /// Wrap bytes that were read from the peer
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// The received bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of received bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when nothing arrived before the deadline
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_line(&self.bytes))
    }
}

/// An open port plus the settings it was opened with
pub struct Connection<T: Transport = Box<dyn SerialPort>> {
    /// Serial port handle
    port: T,
    /// Connection configuration
    config: ConnectionConfig,
    /// Cumulative bytes written
    tx_bytes: u64,
    /// Cumulative bytes read
    rx_bytes: u64,
}

impl Connection {
    /// Open the configured serial port
    pub fn open(config: ConnectionConfig) -> Result<Self, ProtocolError> {
        let port = open_port(&config)?;
        info!(
            port = %config.port_name,
            baud = config.baud_rate,
            "opened serial port"
        );
        Ok(Self::with_transport(port, config))
    }
}

impl<T: Transport> Connection<T> {
    /// Wrap an already open transport
    pub fn with_transport(port: T, config: ConnectionConfig) -> Self {
        Self {
            port,
            config,
            tx_bytes: 0,
            rx_bytes: 0,
        }
    }

    /// Settings this connection was opened with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.port
    }

    /// Total bytes written so far
    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes
    }

    /// Total bytes read so far
    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes
    }

    /// Write a frame to the port.
    ///
    /// No drain is requested; the bytes are handed to the driver and the
    /// following read deadline covers transmission time.
    pub fn send(&mut self, frame: &[u8]) -> Result<(), ProtocolError> {
        self.port.write_all(frame)?;
        self.tx_bytes += frame.len() as u64;
        debug!("wrote {} bytes: {:02x?}", frame.len(), frame);
        Ok(())
    }

    /// Read until `max_response_len` bytes arrived or the deadline passed.
    ///
    /// Running out of time is the normal end of a read, so a short or empty
    /// [`Response`] is returned rather than an error. Only transport failures
    /// other than a timeout are reported.
    pub fn read_response(&mut self) -> Result<Response, ProtocolError> {
        let limit = self.config.max_response_len;
        let deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        let mut buf = vec![0u8; limit];
        let mut filled = 0;

        while filled < limit {
            let now = Instant::now();
            if now >= deadline {
                debug!("read deadline reached after {} of {} bytes", filled, limit);
                break;
            }

            self.port.set_read_timeout(deadline - now)?;
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => {
                    debug!("end of stream after {} bytes", filled);
                    break;
                }
                Ok(n) => {
                    debug!("read {} bytes: {:02x?}", n, &buf[filled..filled + n]);
                    filled += n;
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    debug!("read timed out after {} of {} bytes", filled, limit);
                    break;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ProtocolError::Io(e)),
            }
        }

        buf.truncate(filled);
        self.rx_bytes += filled as u64;
        Ok(Response::new(buf))
    }

    /// Send one frame and collect the reply
    pub fn exchange(&mut self, frame: &[u8]) -> Result<Response, ProtocolError> {
        self.send(frame)?;
        self.read_response()
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        info!(
            port = %self.config.port_name,
            tx = self.tx_bytes,
            rx = self.rx_bytes,
            "closing serial port"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Peer that replies with queued chunks, then times out
    struct ScriptedPort {
        written: Vec<u8>,
        chunks: VecDeque<Vec<u8>>,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(mut chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.chunks.push_front(chunk.split_off(n));
                    }
                    Ok(n)
                }
                None => Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for ScriptedPort {
        fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }
    }

    fn connection(chunks: Vec<Vec<u8>>) -> Connection<ScriptedPort> {
        let port = ScriptedPort {
            written: Vec::new(),
            chunks: chunks.into(),
        };
        Connection::with_transport(port, ConnectionConfig::for_port("mock"))
    }

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.timeout_ms, 1000);
        assert_eq!(config.max_response_len, 32);
        assert!(config.port_name.is_empty());
    }

    #[test]
    fn test_reassembles_chunks() {
        let mut conn = connection(vec![vec![0x04, 0x0e], vec![0x0c]]);
        let response = conn.read_response().unwrap();
        assert_eq!(response.as_bytes(), &[0x04, 0x0e, 0x0c]);
        assert_eq!(conn.rx_bytes(), 3);
    }

    #[test]
    fn test_stops_at_limit() {
        let mut conn = connection(vec![vec![0xab; 40]]);
        let response = conn.read_response().unwrap();
        assert_eq!(response.len(), MAX_RESPONSE_LEN);
    }

    #[test]
    fn test_exchange_counts_bytes() {
        let mut conn = connection(vec![vec![0xaa, 0xbb]]);
        let response = conn.exchange(&[0x01, 0x01, 0x10, 0x00]).unwrap();
        assert_eq!(response.to_string(), " aa bb");
        assert_eq!(conn.tx_bytes(), 4);
        assert_eq!(conn.transport().written, vec![0x01, 0x01, 0x10, 0x00]);
    }

    #[test]
    fn test_empty_response() {
        let mut conn = connection(Vec::new());
        let response = conn.read_response().unwrap();
        assert!(response.is_empty());
        assert_eq!(response.to_string(), "");
    }
}
