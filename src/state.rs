// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::fmt;

use crate::constants::status;

/// Where the host is in bringing up the serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    AwaitingPermission,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::AwaitingPermission => "awaiting-permission",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device-presence and permission notifications from the host side.
///
/// These come from whatever enumerates devices and grants access (a USB
/// hotplug watcher, a permission dialog, or `LedController::connect`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Enumeration found nothing.
    NoDevice,
    /// A candidate device is present.
    DeviceFound { port: String },
    /// Access was granted and the port is open.
    PermissionGranted,
    /// Access was refused.
    PermissionDenied,
    /// The port could not be opened.
    OpenFailed { reason: String },
    /// The device went away.
    DeviceLost,
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: ConnectionState,
    /// Text for the status display, if this step produces any.
    pub status: Option<String>,
}

impl Transition {
    fn to(state: ConnectionState, status: &str) -> Self {
        Self {
            state,
            status: Some(status.to_string()),
        }
    }

    fn stay(state: ConnectionState) -> Self {
        Self { state, status: None }
    }
}

/// Apply a device event to the current connection state.
pub fn transition(state: ConnectionState, event: &DeviceEvent) -> Transition {
    use ConnectionState::*;

    match (state, event) {
        (_, DeviceEvent::NoDevice) => Transition::to(Disconnected, status::NO_DEVICE),

        (Disconnected, DeviceEvent::DeviceFound { .. }) => {
            Transition::to(AwaitingPermission, status::REQUESTING_PERMISSION)
        }
        (AwaitingPermission | Connected, DeviceEvent::DeviceFound { .. }) => Transition::stay(state),

        (AwaitingPermission, DeviceEvent::PermissionGranted) => {
            Transition::to(Connected, status::CONNECTED)
        }
        // A grant that arrives after the device went away, or twice
        (Disconnected | Connected, DeviceEvent::PermissionGranted) => Transition::stay(state),

        (AwaitingPermission, DeviceEvent::PermissionDenied) => {
            Transition::to(Disconnected, status::PERMISSION_DENIED)
        }
        (Disconnected | Connected, DeviceEvent::PermissionDenied) => Transition::stay(state),

        (_, DeviceEvent::OpenFailed { reason }) => Transition {
            state: Disconnected,
            status: Some(if reason.is_empty() {
                status::OPEN_FAILED.to_string()
            } else {
                format!("{}: {}", status::OPEN_FAILED, reason)
            }),
        },

        (AwaitingPermission | Connected, DeviceEvent::DeviceLost) => {
            Transition::to(Disconnected, status::DEVICE_LOST)
        }
        (Disconnected, DeviceEvent::DeviceLost) => Transition::stay(Disconnected),
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::*;
    use super::*;

    fn found() -> DeviceEvent {
        DeviceEvent::DeviceFound {
            port: "/dev/ttyUSB0".to_string(),
        }
    }

    #[test]
    fn test_happy_path() {
        let t = transition(Disconnected, &found());
        assert_eq!(t.state, AwaitingPermission);
        assert_eq!(t.status.as_deref(), Some("Requesting USB permission..."));

        let t = transition(t.state, &DeviceEvent::PermissionGranted);
        assert_eq!(t.state, Connected);
        assert_eq!(t.status.as_deref(), Some("Connected to ESP32"));

        let t = transition(t.state, &DeviceEvent::DeviceLost);
        assert_eq!(t.state, Disconnected);
        assert_eq!(t.status.as_deref(), Some("Device disconnected"));
    }

    #[test]
    fn test_no_device_from_any_state() {
        for state in [Disconnected, AwaitingPermission, Connected] {
            let t = transition(state, &DeviceEvent::NoDevice);
            assert_eq!(t.state, Disconnected);
            assert_eq!(t.status.as_deref(), Some("No ESP32 device found"));
        }
    }

    #[test]
    fn test_permission_denied() {
        let t = transition(AwaitingPermission, &DeviceEvent::PermissionDenied);
        assert_eq!(t.state, Disconnected);
        assert_eq!(t.status.as_deref(), Some("USB permission denied"));

        // Stale denial once connected changes nothing
        let t = transition(Connected, &DeviceEvent::PermissionDenied);
        assert_eq!(t, Transition { state: Connected, status: None });
    }

    #[test]
    fn test_stale_grant_ignored() {
        let t = transition(Disconnected, &DeviceEvent::PermissionGranted);
        assert_eq!(t, Transition { state: Disconnected, status: None });
    }

    #[test]
    fn test_repeat_discovery_keeps_state() {
        assert_eq!(transition(Connected, &found()).state, Connected);
        assert_eq!(transition(AwaitingPermission, &found()).state, AwaitingPermission);
    }

    #[test]
    fn test_open_failed() {
        let t = transition(
            AwaitingPermission,
            &DeviceEvent::OpenFailed {
                reason: "busy".to_string(),
            },
        );
        assert_eq!(t.state, Disconnected);
        assert_eq!(t.status.as_deref(), Some("Failed to open device: busy"));

        let t = transition(Connected, &DeviceEvent::OpenFailed { reason: String::new() });
        assert_eq!(t.status.as_deref(), Some("Failed to open device"));
    }

    #[test]
    fn test_lost_while_disconnected_is_silent() {
        assert_eq!(
            transition(Disconnected, &DeviceEvent::DeviceLost),
            Transition { state: Disconnected, status: None }
        );
    }
}
