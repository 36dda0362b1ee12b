// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use std::time::Duration;

use tokio_serial::{DataBits, Parity, StopBits};

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS, MUSIC_INTERVAL_MS,
    READ_BUFFER_SIZE,
};

/// Configuration for the serial link and the controller built on it.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Serial device path. `None` means pick the first discovered device.
    pub port: Option<String>,
    /// Baud rate (default: 115200)
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    /// Bound on writing one command line (default: 1000)
    pub write_timeout_ms: u64,
    /// Bound on the single read after each command (default: 1000)
    pub read_timeout_ms: u64,
    /// Size of the read buffer (default: 256)
    pub read_buffer_size: usize,
    /// Period of the music beat stream (default: 50)
    pub music_interval_ms: u64,
    /// Period of `ping` keepalives while connected. 0 disables them.
    pub keepalive_interval_ms: u64,
    /// Only consider USB serial adapters during discovery
    pub usb_only: bool,
    /// Send `status` right after connecting
    pub query_status_on_connect: bool,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            read_buffer_size: READ_BUFFER_SIZE,
            music_interval_ms: MUSIC_INTERVAL_MS,
            keepalive_interval_ms: 0,
            usb_only: true,
            query_status_on_connect: true,
            event_capacity: 64,
        }
    }
}

impl LinkConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> LinkConfigBuilder {
        LinkConfigBuilder::default()
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn music_interval(&self) -> Duration {
        Duration::from_millis(self.music_interval_ms.max(1))
    }

    pub fn keepalive_interval(&self) -> Option<Duration> {
        (self.keepalive_interval_ms > 0).then(|| Duration::from_millis(self.keepalive_interval_ms))
    }
}

/// Builder for LinkConfig.
#[derive(Debug, Clone, Default)]
pub struct LinkConfigBuilder {
    config: LinkConfig,
}

impl LinkConfigBuilder {
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = Some(port.into());
        self
    }

    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.baud_rate = baud;
        self
    }

    pub fn data_bits(mut self, bits: DataBits) -> Self {
        self.config.data_bits = bits;
        self
    }

    pub fn stop_bits(mut self, bits: StopBits) -> Self {
        self.config.stop_bits = bits;
        self
    }

    pub fn parity(mut self, parity: Parity) -> Self {
        self.config.parity = parity;
        self
    }

    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size.max(1);
        self
    }

    pub fn music_interval_ms(mut self, ms: u64) -> Self {
        self.config.music_interval_ms = ms;
        self
    }

    pub fn keepalive_interval_ms(mut self, ms: u64) -> Self {
        self.config.keepalive_interval_ms = ms;
        self
    }

    pub fn usb_only(mut self, usb_only: bool) -> Self {
        self.config.usb_only = usb_only;
        self
    }

    pub fn query_status_on_connect(mut self, query: bool) -> Self {
        self.config.query_status_on_connect = query;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> LinkConfig {
        self.config
    }
}
