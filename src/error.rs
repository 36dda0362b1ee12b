// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::io;

/// All errors that can occur in the ledlink library.
///
/// The `Display` text of each variant is what the controller publishes as the
/// user-visible status line, so keep it short.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Not connected")]
    NotConnected,

    #[error("Send error: {0}")]
    TransportWrite(#[source] io::Error),

    #[error("Read error: {0}")]
    TransportRead(#[source] io::Error),

    #[error("USB permission denied")]
    PermissionDenied { port: String },

    #[error("No ESP32 device found")]
    DeviceNotFound,

    #[error("Failed to open {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Invalid command {command:?}: {reason}")]
    InvalidCommand {
        command: String,
        reason: &'static str,
    },

    #[error("Invalid {name} {value} (expected {min}-{max})")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Serial port enumeration failed: {0}")]
    Enumeration(String),
}

impl LinkError {
    /// Whether the failure came from the byte stream itself rather than from
    /// validation or the discovery boundary.
    pub fn is_transport(&self) -> bool {
        matches!(self, LinkError::TransportWrite(_) | LinkError::TransportRead(_))
    }

    /// Whether the failure happened before any byte reached the transport.
    pub fn is_rejected_before_io(&self) -> bool {
        matches!(
            self,
            LinkError::NotConnected
                | LinkError::InvalidCommand { .. }
                | LinkError::InvalidParameter { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(LinkError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            LinkError::PermissionDenied { port: "/dev/ttyUSB0".into() }.to_string(),
            "USB permission denied"
        );
        let err = LinkError::TransportWrite(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        assert_eq!(err.to_string(), "Send error: pipe closed");
    }

    #[test]
    fn test_invalid_parameter_text() {
        let err = LinkError::InvalidParameter {
            name: "brightness",
            value: 300,
            min: 0,
            max: 255,
        };
        assert_eq!(err.to_string(), "Invalid brightness 300 (expected 0-255)");
    }

    #[test]
    fn test_classification() {
        assert!(LinkError::NotConnected.is_rejected_before_io());
        assert!(!LinkError::NotConnected.is_transport());
        let err = LinkError::TransportRead(io::Error::other("gone"));
        assert!(err.is_transport());
        assert!(!err.is_rejected_before_io());
    }
}
