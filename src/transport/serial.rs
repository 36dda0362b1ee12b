// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::io;

use tokio_serial::{FlowControl, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};

/// Open a serial device with the framing from `config`.
pub fn open(path: &str, config: &LinkConfig) -> Result<SerialStream> {
    info!(
        "Opening {} at {} baud ({:?}, {:?}, {:?})",
        path, config.baud_rate, config.data_bits, config.parity, config.stop_bits
    );

    let stream = tokio_serial::new(path, config.baud_rate)
        .data_bits(config.data_bits)
        .stop_bits(config.stop_bits)
        .parity(config.parity)
        .flow_control(FlowControl::None)
        .timeout(config.read_timeout())
        .open_native_async()
        .map_err(|e| {
            error!("Failed to open {}: {}", path, e);
            classify_open_error(path, &e)
        })?;

    debug!("Serial port {} open", path);
    Ok(stream)
}

/// Map a serial open failure onto the link's error taxonomy.
pub fn classify_open_error(path: &str, err: &tokio_serial::Error) -> LinkError {
    match err.kind() {
        tokio_serial::ErrorKind::NoDevice => LinkError::DeviceNotFound,
        tokio_serial::ErrorKind::Io(io::ErrorKind::PermissionDenied) => LinkError::PermissionDenied {
            port: path.to_string(),
        },
        tokio_serial::ErrorKind::Io(io::ErrorKind::NotFound) => LinkError::DeviceNotFound,
        _ => LinkError::OpenFailed {
            port: path.to_string(),
            reason: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_serial::ErrorKind;

    #[test]
    fn test_classify_permission_denied() {
        let err = tokio_serial::Error::new(ErrorKind::Io(io::ErrorKind::PermissionDenied), "EACCES");
        assert!(matches!(
            classify_open_error("/dev/ttyUSB0", &err),
            LinkError::PermissionDenied { port } if port == "/dev/ttyUSB0"
        ));
    }

    #[test]
    fn test_classify_missing_device() {
        let err = tokio_serial::Error::new(ErrorKind::NoDevice, "gone");
        assert!(matches!(classify_open_error("COM3", &err), LinkError::DeviceNotFound));
    }

    #[test]
    fn test_classify_other() {
        let err = tokio_serial::Error::new(ErrorKind::InvalidInput, "bad baud");
        match classify_open_error("/dev/ttyACM0", &err) {
            LinkError::OpenFailed { port, reason } => {
                assert_eq!(port, "/dev/ttyACM0");
                assert!(reason.contains("bad baud"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
