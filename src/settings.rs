//! Connection settings and their persistence.
//!
//! [`SocketSetting`] and [`SerialSetting`] are plain data with builder
//! methods. Both persist as JSON through the [`Persist`] trait:
//!
//! ```no_run
//! use plc_link::settings::{Persist, ProtocolFormat, SocketSetting};
//!
//! let setting = SocketSetting::new("192.168.10.100", 6000)
//!     .with_protocol_format(ProtocolFormat::Ascii)
//!     .with_timeout_ms(2000);
//! setting.save("plc.json")?;
//!
//! let loaded = SocketSetting::load("plc.json")?;
//! assert_eq!(loaded, setting);
//! # Ok::<(), plc_link::PlcError>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Directory the `*_default` variants read from and write to.
pub const DEFAULT_DIR: &str = "Check Box";

/// Socket request encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProtocolFormat {
    /// Binary frames.
    #[default]
    Binary,
    /// ASCII frames.
    Ascii,
}

/// Serial parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Serial stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopBits {
    /// One stop bit.
    #[default]
    One,
    /// Two stop bits.
    Two,
}

/// Serial flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Handshake {
    /// No flow control.
    #[default]
    None,
    /// XON/XOFF software flow control.
    XonXoff,
    /// RTS/CTS hardware flow control.
    RequestToSend,
}

/// TCP link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketSetting {
    /// PLC host name or IP address.
    pub ip: String,
    /// PLC port.
    pub port: u16,
    /// Frame encoding.
    pub protocol_format: ProtocolFormat,
    /// Mitsubishi network number.
    pub network_no: u8,
    /// Mitsubishi PC number.
    pub pc_no: u8,
    /// Panasonic unit (station) number.
    pub unit_no: u8,
    /// Connect and response timeout in milliseconds.
    pub timeout_ms: u32,
    /// Consecutive reconnect attempts before giving up; 0 retries forever.
    pub reconnect_count: u16,
}

impl Default for SocketSetting {
    fn default() -> Self {
        Self {
            ip: "192.168.10.100".to_string(),
            port: 6000,
            protocol_format: ProtocolFormat::Binary,
            network_no: 0x00,
            pc_no: 0xFF,
            unit_no: 1,
            timeout_ms: 1000,
            reconnect_count: 0,
        }
    }
}

impl SocketSetting {
    /// Settings for `ip:port` with every other field at its default.
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
            ..Self::default()
        }
    }

    /// Sets the frame encoding.
    pub fn with_protocol_format(mut self, format: ProtocolFormat) -> Self {
        self.protocol_format = format;
        self
    }

    /// Sets the Mitsubishi network and PC numbers.
    pub fn with_route(mut self, network_no: u8, pc_no: u8) -> Self {
        self.network_no = network_no;
        self.pc_no = pc_no;
        self
    }

    /// Sets the Panasonic unit number.
    pub fn with_unit_no(mut self, unit_no: u8) -> Self {
        self.unit_no = unit_no;
        self
    }

    /// Sets the timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the reconnect budget.
    pub fn with_reconnect_count(mut self, count: u16) -> Self {
        self.reconnect_count = count;
        self
    }
}

/// Serial link settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSetting {
    /// Port name (`COM1`, `/dev/ttyUSB0`).
    pub port_name: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Data bits, 5 to 8.
    pub data_bits: u8,
    /// Parity.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Flow control.
    pub handshake: Handshake,
    /// Mitsubishi network number.
    pub network_no: u8,
    /// Mitsubishi PC number.
    pub pc_no: u8,
    /// Mitsubishi station number.
    pub host_station_no: u8,
    /// Panasonic unit (station) number.
    pub unit_no: u8,
    /// Response timeout in milliseconds.
    pub timeout_ms: u32,
    /// Consecutive reconnect attempts before giving up; 0 retries forever.
    pub reconnect_count: u16,
}

impl Default for SerialSetting {
    fn default() -> Self {
        Self {
            port_name: "COM1".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            handshake: Handshake::None,
            network_no: 0x00,
            pc_no: 0xFF,
            host_station_no: 0x00,
            unit_no: 1,
            timeout_ms: 1000,
            reconnect_count: 0,
        }
    }
}

impl SerialSetting {
    /// Settings for `port_name` at `baud_rate`, 8N1 without flow control.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Sets data bits, parity and stop bits.
    pub fn with_line(mut self, data_bits: u8, parity: Parity, stop_bits: StopBits) -> Self {
        self.data_bits = data_bits;
        self.parity = parity;
        self.stop_bits = stop_bits;
        self
    }

    /// Sets flow control.
    pub fn with_handshake(mut self, handshake: Handshake) -> Self {
        self.handshake = handshake;
        self
    }

    /// Sets the Mitsubishi station, network and PC numbers.
    pub fn with_route(mut self, host_station_no: u8, network_no: u8, pc_no: u8) -> Self {
        self.host_station_no = host_station_no;
        self.network_no = network_no;
        self.pc_no = pc_no;
        self
    }

    /// Sets the Panasonic unit number.
    pub fn with_unit_no(mut self, unit_no: u8) -> Self {
        self.unit_no = unit_no;
        self
    }

    /// Sets the response timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Sets the reconnect budget.
    pub fn with_reconnect_count(mut self, count: u16) -> Self {
        self.reconnect_count = count;
        self
    }
}

/// JSON persistence for settings types.
pub trait Persist: Serialize + DeserializeOwned + Default {
    /// Writes the settings to `path`, creating parent directories.
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Reads settings from `path`. A missing file is first created from
    /// the default settings.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_or_create(path.as_ref(), &Self::default())
    }

    /// Writes the settings to `file_name` under [`DEFAULT_DIR`].
    fn save_default(&self, file_name: &str) -> Result<()> {
        self.save(default_path(file_name))
    }

    /// Reads settings from `file_name` under [`DEFAULT_DIR`].
    fn load_default(file_name: &str) -> Result<Self> {
        Self::load(default_path(file_name))
    }
}

impl Persist for SocketSetting {}
impl Persist for SerialSetting {}

/// Path of `file_name` inside [`DEFAULT_DIR`].
pub fn default_path(file_name: &str) -> PathBuf {
    Path::new(DEFAULT_DIR).join(file_name)
}

/// Reads `path`, saving `current` there first when the file is missing.
pub fn load_or_create<T: Persist>(path: &Path, current: &T) -> Result<T> {
    if !path.exists() {
        info!(path = %path.display(), "settings file missing, writing current settings");
        current.save(path)?;
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
