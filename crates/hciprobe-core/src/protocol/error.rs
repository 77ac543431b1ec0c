//! Protocol errors

use thiserror::Error;

/// Errors that can occur during protocol communication
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid response from controller: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for errors raised while acquiring the port, before any byte is sent
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::PortNotFound(_) | ProtocolError::ConnectionFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_classification() {
        assert!(ProtocolError::PortNotFound("/dev/ttyACM9".into()).is_connection_error());
        assert!(ProtocolError::ConnectionFailed("busy".into()).is_connection_error());

        let io = ProtocolError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "gone",
        ));
        assert!(!io.is_connection_error());
        assert!(io.to_string().starts_with("I/O error"));
    }
}
