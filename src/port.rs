//! Serial port discovery and opening.

use std::fmt;
use std::thread;
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};

use crate::channel::LineChannel;
use crate::error::PortError;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read timeout applied to the port; bounds each `LineChannel::poll`.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// The microcontroller resets when the port opens; give it time to boot.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Substrings (lowercase) that mark a likely microcontroller adapter.
const ADAPTER_HINTS: &[&str] = &["arduino", "usb", "ch340", "cp210", "ftdi"];

/// Information about an available serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS device path, e.g. `/dev/ttyUSB0`
    pub name: String,
    /// Human-readable description
    pub description: String,
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// How to open the port.
#[derive(Debug, Clone)]
pub struct PortSettings {
    /// Explicit device path; `None` means auto-detect
    pub path: Option<String>,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            path: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// List all serial ports on the system.
///
/// An empty list is not an error.
pub fn list_ports() -> Result<Vec<PortInfo>, PortError> {
    let ports = serialport::available_ports().map_err(|e| PortError::Enumerate(e.to_string()))?;
    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            description: describe(&p.port_type),
            name: p.port_name,
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("USB Serial Device");
            match usb.manufacturer.as_deref() {
                Some(maker) => format!(
                    "{} ({}) USB {:04x}:{:04x}",
                    product, maker, usb.vid, usb.pid
                ),
                None => format!("{} USB {:04x}:{:04x}", product, usb.vid, usb.pid),
            }
        }
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::Unknown => "Unknown".to_string(),
    }
}

/// Pick the port most likely to be the camera.
///
/// Prefers the first port whose name or description mentions a known
/// adapter, otherwise the first port at all.
pub fn pick_camera_port(ports: &[PortInfo]) -> Option<&PortInfo> {
    ports
        .iter()
        .find(|p| {
            let haystack = format!("{} {}", p.name, p.description).to_lowercase();
            ADAPTER_HINTS.iter().any(|hint| haystack.contains(hint))
        })
        .or_else(|| ports.first())
}

/// Open the camera port and wrap it in a [`LineChannel`].
///
/// Blocks for `settle_delay` after opening so the device can boot.
///
/// # Errors
/// * `PortError::NoPorts` - auto-detect found nothing
/// * `PortError::Open` - the port exists but can't be opened
pub fn open_channel(settings: &PortSettings) -> Result<LineChannel<Box<dyn SerialPort>>, PortError> {
    let path = match &settings.path {
        Some(path) => path.clone(),
        None => {
            let ports = list_ports()?;
            let port = pick_camera_port(&ports).ok_or(PortError::NoPorts)?;
            log::info!("Auto-selected port {}", port);
            port.name.clone()
        }
    };

    let port = serialport::new(&path, settings.baud_rate)
        .timeout(settings.read_timeout)
        .open()
        .map_err(|e| PortError::Open {
            port: path.clone(),
            message: e.to_string(),
        })?;
    log::info!("Connected to {} at {} baud", path, settings.baud_rate);

    if !settings.settle_delay.is_zero() {
        log::debug!("Waiting {:?} for device to settle", settings.settle_delay);
        thread::sleep(settings.settle_delay);
    }
    Ok(LineChannel::new(port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, description: &str) -> PortInfo {
        PortInfo {
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_port_info_display() {
        assert_eq!(
            format!("{}", port("/dev/ttyACM0", "Arduino Uno")),
            "/dev/ttyACM0: Arduino Uno"
        );
    }

    #[test]
    fn test_pick_prefers_known_adapter() {
        let ports = vec![
            port("/dev/ttyS0", "PCI serial port"),
            port("/dev/ttyUSB0", "CH340 serial converter"),
        ];
        assert_eq!(pick_camera_port(&ports).unwrap().name, "/dev/ttyUSB0");
    }

    #[test]
    fn test_pick_falls_back_to_first() {
        let ports = vec![port("/dev/ttyS0", "PCI serial port"), port("/dev/ttyS1", "Unknown")];
        assert_eq!(pick_camera_port(&ports).unwrap().name, "/dev/ttyS0");
        assert!(pick_camera_port(&[]).is_none());
    }

    #[test]
    fn test_list_ports_does_not_panic() {
        // Enumeration may fail in sandboxes; it just must not panic.
        let _ = list_ports();
    }

    #[test]
    fn test_open_missing_port_fails() {
        let settings = PortSettings {
            path: Some("/dev/serialcam-does-not-exist".to_string()),
            settle_delay: Duration::ZERO,
            ..PortSettings::default()
        };
        assert!(matches!(
            open_channel(&settings),
            Err(PortError::Open { .. })
        ));
    }
}
