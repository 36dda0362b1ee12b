// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::{debug, info};

use crate::error::{LinkError, Result};

/// A serial device that could carry the command link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub port_name: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl DeviceInfo {
    /// A device known only by its path (e.g. from configuration).
    pub fn from_path(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            vid: None,
            pid: None,
            serial_number: None,
            manufacturer: None,
            product: None,
        }
    }

    pub fn is_usb(&self) -> bool {
        self.vid.is_some()
    }

    /// One-line description for listings.
    pub fn describe(&self) -> String {
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => format!(
                "{} [{:04x}:{:04x}] {} {}",
                self.port_name,
                vid,
                pid,
                self.manufacturer.as_deref().unwrap_or("-"),
                self.product.as_deref().unwrap_or("-"),
            ),
            _ => self.port_name.clone(),
        }
    }
}

impl From<SerialPortInfo> for DeviceInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                port_name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                serial_number: usb.serial_number,
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self::from_path(info.port_name),
        }
    }
}

/// Enumerate serial devices on this host.
pub fn list_devices(usb_only: bool) -> Result<Vec<DeviceInfo>> {
    let ports = tokio_serial::available_ports().map_err(|e| LinkError::Enumeration(e.to_string()))?;
    let devices: Vec<DeviceInfo> = ports
        .into_iter()
        .map(DeviceInfo::from)
        .filter(|d| !usb_only || d.is_usb())
        .collect();
    debug!("Found {} candidate serial device(s)", devices.len());
    Ok(devices)
}

/// Pick the device to connect to: the first candidate, like a single-device
/// phone app would. Returns `None` when nothing suitable is attached.
pub fn select_device(devices: Vec<DeviceInfo>, usb_only: bool) -> Option<DeviceInfo> {
    let selected = devices.into_iter().find(|d| !usb_only || d.is_usb());
    if let Some(ref device) = selected {
        info!("Selected device {}", device.describe());
    }
    selected
}

/// Enumerate and select in one step.
pub fn find_device(usb_only: bool) -> Result<Option<DeviceInfo>> {
    Ok(select_device(list_devices(usb_only)?, usb_only))
}
