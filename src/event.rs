// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use crate::protocol::Response;
use crate::state::ConnectionState;

/// All events emitted by the controller.
///
/// Users subscribe via `controller.subscribe()` to receive a
/// `tokio::sync::broadcast::Receiver<LinkEvent>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Connection state changed
    StateChanged {
        old: ConnectionState,
        new: ConnectionState,
    },
    /// Text for the status display (state changes, `RESPONSE:` replies, errors)
    Status(String),
    /// Any non-empty reply read back after a command, surfaced or not
    Reply(Response),
}

/// Type alias for the broadcast sender.
pub type EventSender = tokio::sync::broadcast::Sender<LinkEvent>;

/// Type alias for the broadcast receiver.
pub type EventReceiver = tokio::sync::broadcast::Receiver<LinkEvent>;

/// Create a new event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    tokio::sync::broadcast::channel(capacity)
}
