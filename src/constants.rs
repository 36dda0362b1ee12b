// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

/// Line terminator appended to every command on the wire.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Prefix the firmware puts on lines meant for the status display.
pub const RESPONSE_PREFIX: &str = "RESPONSE:";

/// Prefix (after `RESPONSE:`) of firmware error replies.
pub const ERROR_PREFIX: &str = "ERROR";

/// Serial framing used by the firmware: 115200 baud, 8-N-1.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Size of the single read performed after each command.
pub const READ_BUFFER_SIZE: usize = 256;

/// Music beat samples are pushed at 20 Hz.
pub const MUSIC_INTERVAL_MS: u64 = 50;

/// The firmware discards command lines longer than this.
pub const MAX_COMMAND_LEN: usize = 100;

/// The firmware flags the USB link as idle after 30s without a command.
pub const DEVICE_SILENCE_TIMEOUT_MS: u64 = 30_000;

pub const BRIGHTNESS_MIN: i64 = 0;
pub const BRIGHTNESS_MAX: i64 = 255;

/// Slider position the app starts at (50%).
pub const DEFAULT_BRIGHTNESS: u8 = 128;

pub const MUSIC_INTENSITY_MIN: i64 = 0;
pub const MUSIC_INTENSITY_MAX: i64 = 100;

/// Status lines published by the connection state machine.
pub mod status {
    pub const NO_DEVICE: &str = "No ESP32 device found";
    pub const REQUESTING_PERMISSION: &str = "Requesting USB permission...";
    pub const CONNECTED: &str = "Connected to ESP32";
    pub const PERMISSION_DENIED: &str = "USB permission denied";
    pub const OPEN_FAILED: &str = "Failed to open device";
    pub const DEVICE_LOST: &str = "Device disconnected";
}

/// Unsolicited or fixed replies the firmware sends after `RESPONSE:`.
pub mod notice {
    pub const USB_CONNECTED: &str = "USB_CONNECTED";
    pub const USB_TIMEOUT: &str = "USB_TIMEOUT";
    pub const PONG: &str = "PONG";
}
