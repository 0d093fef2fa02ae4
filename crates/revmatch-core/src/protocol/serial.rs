//! Serial port handling
//!
//! Low-level serial access for USB and Bluetooth ELM327 adapters.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// USB-serial bridge vendors found in common ELM327 clones
/// (FTDI, WCH CH340, Prolific, Silicon Labs CP210x)
const ADAPTER_VENDOR_IDS: [u16; 4] = [0x0403, 0x1A86, 0x067B, 0x10C4];

/// Read timeout of the underlying port; reads are retried until the
/// command deadline, so this only bounds how long one poll blocks
const PORT_READ_TIMEOUT_MS: u64 = 100;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "/dev/rfcomm0" or "COM9")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            product: None,
        }
    }

    /// Whether the port looks like a USB or Bluetooth OBD-II adapter
    pub fn is_likely_adapter(&self) -> bool {
        if let Some(vid) = self.vid {
            return ADAPTER_VENDOR_IDS.contains(&vid);
        }
        let basename = self.name.rsplit('/').next().unwrap_or(&self.name);
        basename.starts_with("rfcomm")
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Ordering for port listings:
///  - COMn ports, numerically
///  - ttyUSB*, then rfcomm*, then ttyACM*, numerically by suffix
///  - everything else by name
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let families = [("COM", 0u8), ("ttyUSB", 1), ("rfcomm", 2), ("ttyACM", 3)];
    for (prefix, rank) in families {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, basename.to_string());
        }
    }
    (4, 0, basename.to_string())
}

/// List available serial ports, adapters first, in a deterministic order
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // Bound Bluetooth adapters are not always enumerated by the API
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("rfcomm") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut ports: Vec<PortInfo> = map.into_values().collect();
    ports.sort_by_key(|p| (!p.is_likely_adapter(), port_sort_key(&p.name)));
    ports
}

/// Open a serial port for an ELM327 adapter
pub fn open_port(name: &str, baud_rate: Option<u32>) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    tracing::debug!(port = name, baud, "opening serial port");

    serialport::new(name, baud)
        .timeout(Duration::from_millis(PORT_READ_TIMEOUT_MS))
        .open()
        .map_err(|e| ProtocolError::SerialError(format!("{}: {}", name, e)))
}

/// Configure a serial port as 8N1 without flow control
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    let serial_err = |e: serialport::Error| ProtocolError::SerialError(e.to_string());

    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(serial_err)?;
    port.set_parity(serialport::Parity::None).map_err(serial_err)?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(serial_err)?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(serial_err)?;
    port.clear(serialport::ClearBuffer::All).map_err(serial_err)?;

    Ok(())
}
