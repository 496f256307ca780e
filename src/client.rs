//! PLC clients for each vendor and transport.
//!
//! [`Plc`] is one client type parameterized by a [`Link`] that picks the
//! settings type, the dialect and the transport:
//!
//! | Alias | Link | Settings | Dialect |
//! |-------|------|----------|---------|
//! | [`MitsubishiSocketPlc`] | [`MitsubishiSocket`] | [`SocketSetting`] | 3E binary or ASCII |
//! | [`MitsubishiSerialPlc`] | [`MitsubishiSerial`] | [`SerialSetting`] | 3C format 4 |
//! | [`PanasonicSocketPlc`] | [`PanasonicSocket`] | [`SocketSetting`] | MEWTOCOL binary or ASCII |
//! | [`PanasonicSerialPlc`] | [`PanasonicSerial`] | [`SerialSetting`] | MEWTOCOL-COM ASCII |
//!
//! # Example
//!
//! ```no_run
//! use plc_link::mitsubishi::Device;
//! use plc_link::{MitsubishiSocketPlc, SendingPacket, SocketSetting};
//!
//! let mut plc = MitsubishiSocketPlc::new(SocketSetting::new("192.168.10.100", 6000));
//! plc.connect()?;
//!
//! plc.write(&SendingPacket::write(Device::D, 100, 1234i16))?;
//! let reply = plc.read(&SendingPacket::read(Device::D, 100, 1))?;
//! assert_eq!(reply.to_i16s(), vec![1234]);
//!
//! plc.disconnect();
//! # Ok::<(), plc_link::PlcError>(())
//! ```
//!
//! # Thread Safety
//!
//! Reads and writes take `&self`; one request is in flight per client at a
//! time and concurrent callers queue on the session lock.

use std::fmt;
use std::path::Path;
use std::slice;
use std::time::Duration;

use tracing::info;

use crate::error::{PlcError, Result};
use crate::mitsubishi::{Dialect, MitsubishiProtocol, Route};
use crate::packet::{ReceivingPacket, SendingPacket};
use crate::panasonic::{Format, Medium, PanasonicProtocol};
use crate::protocol::Protocol;
use crate::session::{Session, SessionOptions, SessionState};
use crate::settings::{load_or_create, Persist, ProtocolFormat, SerialSetting, SocketSetting};
use crate::transport::{Connector, SerialConnector, TcpConnector};

/// Vendor and transport selection for a [`Plc`].
pub trait Link: 'static {
    /// Settings the link is configured with.
    type Settings: Persist + Clone + fmt::Debug;
    /// Dialect spoken on the link.
    type Protocol: Protocol;

    /// File name used by the default-path settings variants.
    const SETTINGS_FILE: &'static str;
    /// Medium named when reconnecting gives up.
    const CABLE: &'static str;

    /// Builds the dialect from settings.
    fn protocol(settings: &Self::Settings) -> Self::Protocol;
    /// Builds the transport from settings.
    fn connector(settings: &Self::Settings) -> Box<dyn Connector>;
    /// Session timing from settings.
    fn options(settings: &Self::Settings) -> SessionOptions;
}

fn options(timeout_ms: u32, reconnect_count: u16, cable: &str) -> SessionOptions {
    SessionOptions::default()
        .with_response_timeout(Duration::from_millis(u64::from(timeout_ms)))
        .with_reconnect_count(reconnect_count)
        .with_cable_hint(cable)
}

/// Mitsubishi MC protocol over TCP.
#[derive(Debug, Clone, Copy)]
pub struct MitsubishiSocket;

impl Link for MitsubishiSocket {
    type Settings = SocketSetting;
    type Protocol = MitsubishiProtocol;
    const SETTINGS_FILE: &'static str = "Mitsubishi_Socket.json";
    const CABLE: &'static str = "LAN cable";

    fn protocol(s: &SocketSetting) -> MitsubishiProtocol {
        let dialect = match s.protocol_format {
            ProtocolFormat::Binary => Dialect::Binary,
            ProtocolFormat::Ascii => Dialect::Ascii,
        };
        MitsubishiProtocol::new(dialect, Route::new(s.network_no, s.pc_no), s.timeout_ms)
    }

    fn connector(s: &SocketSetting) -> Box<dyn Connector> {
        Box::new(TcpConnector::from_setting(s))
    }

    fn options(s: &SocketSetting) -> SessionOptions {
        options(s.timeout_ms, s.reconnect_count, Self::CABLE)
    }
}

/// Mitsubishi MC protocol over a serial line.
#[derive(Debug, Clone, Copy)]
pub struct MitsubishiSerial;

impl Link for MitsubishiSerial {
    type Settings = SerialSetting;
    type Protocol = MitsubishiProtocol;
    const SETTINGS_FILE: &'static str = "Mitsubishi_Serial.json";
    const CABLE: &'static str = "serial cable";

    fn protocol(s: &SerialSetting) -> MitsubishiProtocol {
        let route = Route::new(s.network_no, s.pc_no).with_station(s.host_station_no);
        MitsubishiProtocol::new(Dialect::Serial, route, s.timeout_ms)
    }

    fn connector(s: &SerialSetting) -> Box<dyn Connector> {
        Box::new(SerialConnector::new(s.clone()))
    }

    fn options(s: &SerialSetting) -> SessionOptions {
        options(s.timeout_ms, s.reconnect_count, Self::CABLE)
    }
}

/// Panasonic MEWTOCOL over TCP.
#[derive(Debug, Clone, Copy)]
pub struct PanasonicSocket;

impl Link for PanasonicSocket {
    type Settings = SocketSetting;
    type Protocol = PanasonicProtocol;
    const SETTINGS_FILE: &'static str = "Panasonic_Socket.json";
    const CABLE: &'static str = "LAN cable";

    fn protocol(s: &SocketSetting) -> PanasonicProtocol {
        let format = match s.protocol_format {
            ProtocolFormat::Binary => Format::Binary,
            ProtocolFormat::Ascii => Format::Ascii,
        };
        PanasonicProtocol::new(format, Medium::Socket, s.unit_no)
    }

    fn connector(s: &SocketSetting) -> Box<dyn Connector> {
        Box::new(TcpConnector::from_setting(s))
    }

    fn options(s: &SocketSetting) -> SessionOptions {
        options(s.timeout_ms, s.reconnect_count, Self::CABLE)
    }
}

/// Panasonic MEWTOCOL-COM over a serial line.
#[derive(Debug, Clone, Copy)]
pub struct PanasonicSerial;

impl Link for PanasonicSerial {
    type Settings = SerialSetting;
    type Protocol = PanasonicProtocol;
    const SETTINGS_FILE: &'static str = "Panasonic_Serial.json";
    const CABLE: &'static str = "serial cable";

    fn protocol(s: &SerialSetting) -> PanasonicProtocol {
        PanasonicProtocol::new(Format::Ascii, Medium::Serial, s.unit_no)
    }

    fn connector(s: &SerialSetting) -> Box<dyn Connector> {
        Box::new(SerialConnector::new(s.clone()))
    }

    fn options(s: &SerialSetting) -> SessionOptions {
        options(s.timeout_ms, s.reconnect_count, Self::CABLE)
    }
}

/// Packet type a [`Plc`] sends.
pub type Sending<L> = SendingPacket<<<L as Link>::Protocol as Protocol>::Device>;
/// Packet type a [`Plc`] receives.
pub type Receiving<L> = ReceivingPacket<<<L as Link>::Protocol as Protocol>::Device>;

/// Client for one PLC.
///
/// Settings are read when [`connect`](Self::connect) opens the session;
/// changes made afterwards apply on the next connect.
pub struct Plc<L: Link> {
    settings: L::Settings,
    session: Option<Session<L::Protocol>>,
}

/// Mitsubishi PLC over TCP.
pub type MitsubishiSocketPlc = Plc<MitsubishiSocket>;
/// Mitsubishi PLC over a serial line.
pub type MitsubishiSerialPlc = Plc<MitsubishiSerial>;
/// Panasonic PLC over TCP.
pub type PanasonicSocketPlc = Plc<PanasonicSocket>;
/// Panasonic PLC over a serial line.
pub type PanasonicSerialPlc = Plc<PanasonicSerial>;

impl<L: Link> fmt::Debug for Plc<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plc")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish()
    }
}

impl<L: Link> Default for Plc<L> {
    fn default() -> Self {
        Self::new(L::Settings::default())
    }
}

impl<L: Link> Plc<L> {
    /// Creates a disconnected client.
    pub fn new(settings: L::Settings) -> Self {
        Self {
            settings,
            session: None,
        }
    }

    /// Current settings.
    pub fn settings(&self) -> &L::Settings {
        &self.settings
    }

    /// Mutable settings; applied on the next connect.
    pub fn settings_mut(&mut self) -> &mut L::Settings {
        &mut self.settings
    }

    /// Opens the session.
    ///
    /// # Errors
    ///
    /// [`PlcError::AlreadyConnected`] while a live session exists, or the
    /// transport error when the PLC cannot be reached.
    pub fn connect(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            if session.is_connected() {
                return Err(PlcError::AlreadyConnected);
            }
        }
        if let Some(stale) = self.session.take() {
            stale.close();
        }
        let session = Session::open(
            L::protocol(&self.settings),
            L::connector(&self.settings),
            L::options(&self.settings),
        )?;
        self.session = Some(session);
        Ok(())
    }

    /// Closes the session. Does nothing when not connected.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    /// Reopens the transport, keeping the configuration.
    ///
    /// Also restarts automatic recovery after a fatal reconnect failure.
    ///
    /// # Errors
    ///
    /// [`PlcError::NotConnected`] before [`connect`](Self::connect), or the
    /// transport error when the PLC cannot be reached.
    pub fn refresh(&self) -> Result<()> {
        self.session()?.refresh()
    }

    /// True while the link is up.
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_connected)
    }

    /// Lifecycle state; [`SessionState::Disconnected`] without a session.
    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map_or(SessionState::Disconnected, Session::state)
    }

    /// Reconnect failure that stopped automatic recovery, if any.
    pub fn fatal_error(&self) -> Option<String> {
        self.session.as_ref().and_then(Session::fatal_error)
    }

    /// Writes one packet.
    ///
    /// # Errors
    ///
    /// Same as [`write_batch`](Self::write_batch).
    pub fn write(&self, packet: &Sending<L>) -> Result<()> {
        self.write_batch(slice::from_ref(packet))
    }

    /// Writes several packets; booleans and words travel in separate frames.
    ///
    /// # Errors
    ///
    /// - [`PlcError::NotConnected`] or [`PlcError::ReconnectFailed`] without
    ///   a live link
    /// - [`PlcError::InvalidParameter`] for read packets, an empty batch or
    ///   an oversized frame
    /// - [`PlcError::TooManyMessages`] when a random write exceeds 255 items
    /// - [`PlcError::InvalidAddressing`] or [`PlcError::InvalidDataFormat`]
    ///   for values the device cannot take
    /// - [`PlcError::Timeout`], [`PlcError::NegativeAcknowledgement`] or
    ///   [`PlcError::Framing`] from the exchange itself
    ///
    /// # Example
    ///
    /// ```no_run
    /// use plc_link::mitsubishi::Device;
    /// use plc_link::{MitsubishiSocketPlc, SendingPacket, SocketSetting};
    ///
    /// let mut plc = MitsubishiSocketPlc::new(SocketSetting::new("192.168.10.100", 6000));
    /// plc.connect()?;
    /// plc.write_batch(&[
    ///     SendingPacket::write(Device::M, 0, true),
    ///     SendingPacket::write(Device::D, 200, 1.5f32),
    /// ])?;
    /// # Ok::<(), plc_link::PlcError>(())
    /// ```
    pub fn write_batch(&self, packets: &[Sending<L>]) -> Result<()> {
        self.session()?.write(packets)
    }

    /// Reads one packet.
    ///
    /// # Errors
    ///
    /// Same as [`read_batch`](Self::read_batch).
    pub fn read(&self, packet: &Sending<L>) -> Result<Receiving<L>> {
        self.read_batch(slice::from_ref(packet))?
            .into_iter()
            .next()
            .ok_or_else(|| PlcError::framing("reply carried no packet"))
    }

    /// Reads several packets; results come back in request order.
    ///
    /// # Errors
    ///
    /// As for [`write_batch`](Self::write_batch), with write packets and a
    /// zero word count rejected as [`PlcError::InvalidParameter`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use plc_link::panasonic::Device;
    /// use plc_link::{PanasonicSocketPlc, SendingPacket, SocketSetting};
    ///
    /// let mut plc = PanasonicSocketPlc::new(SocketSetting::new("192.168.1.5", 9094));
    /// plc.connect()?;
    /// let replies = plc.read_batch(&[
    ///     SendingPacket::read(Device::DT, 0, 2),
    ///     SendingPacket::contact_read(Device::R, "12", 1)?,
    /// ])?;
    /// println!("DT0 = {}", replies[0].to_i32s()[0]);
    /// println!("R12 = {}", replies[1].to_bools()[0]);
    /// # Ok::<(), plc_link::PlcError>(())
    /// ```
    pub fn read_batch(&self, packets: &[Sending<L>]) -> Result<Vec<Receiving<L>>> {
        self.session()?.read(packets)
    }

    /// Replaces the settings with the ones stored at `path`. A missing file
    /// is first written from the current settings.
    ///
    /// # Errors
    ///
    /// [`PlcError::Io`] when the file cannot be read or created, and
    /// [`PlcError::Settings`] when it does not hold valid settings.
    pub fn load_settings(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.settings = load_or_create(path, &self.settings)?;
        info!(path = %path.display(), "settings loaded");
        Ok(())
    }

    /// Stores the current settings at `path`.
    ///
    /// # Errors
    ///
    /// [`PlcError::Io`] when the file cannot be written.
    pub fn save_settings(&self, path: impl AsRef<Path>) -> Result<()> {
        self.settings.save(path)
    }

    /// [`load_settings`](Self::load_settings) from the default location.
    pub fn load_default_settings(&mut self) -> Result<()> {
        self.load_settings(crate::settings::default_path(L::SETTINGS_FILE))
    }

    /// [`save_settings`](Self::save_settings) to the default location.
    pub fn save_default_settings(&self) -> Result<()> {
        self.settings.save_default(L::SETTINGS_FILE)
    }

    fn session(&self) -> Result<&Session<L::Protocol>> {
        self.session.as_ref().ok_or(PlcError::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mitsubishi::Device as MDevice;
    use std::net::TcpListener;

    #[test]
    fn test_not_connected() {
        let plc = MitsubishiSocketPlc::default();
        assert!(!plc.is_connected());
        assert_eq!(plc.state(), SessionState::Disconnected);
        assert!(plc.fatal_error().is_none());
        let err = plc
            .write(&SendingPacket::write(MDevice::D, 0, 1u16))
            .unwrap_err();
        assert!(matches!(err, PlcError::NotConnected));
        assert!(matches!(plc.refresh(), Err(PlcError::NotConnected)));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut plc = PanasonicSerialPlc::default();
        plc.disconnect();
        plc.disconnect();
        assert!(!plc.is_connected());
    }

    #[test]
    fn test_connect_twice() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut plc = PanasonicSocketPlc::new(SocketSetting::new("127.0.0.1", port));
        plc.connect().unwrap();
        let _peer = listener.accept().unwrap();
        assert!(plc.is_connected());
        assert!(matches!(plc.connect(), Err(PlcError::AlreadyConnected)));
        plc.disconnect();
        assert_eq!(plc.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_link_selection() {
        let s = SocketSetting::default().with_protocol_format(ProtocolFormat::Ascii);
        assert_eq!(MitsubishiSocket::protocol(&s).dialect(), Dialect::Ascii);
        assert_eq!(PanasonicSocket::protocol(&s).format(), Format::Ascii);
        let s = SerialSetting::default();
        assert_eq!(MitsubishiSerial::protocol(&s).dialect(), Dialect::Serial);
        assert_eq!(PanasonicSerial::protocol(&s).format(), Format::Ascii);
        assert_eq!(MitsubishiSerial::options(&s).cable_hint, "serial cable");
        assert_eq!(
            MitsubishiSocket::options(&SocketSetting::default()).response_timeout,
            Duration::from_millis(1000)
        );
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plc.json");

        let mut plc = MitsubishiSerialPlc::new(SerialSetting::new("COM4", 115_200));
        plc.load_settings(&path).unwrap();
        assert_eq!(plc.settings().port_name, "COM4");

        plc.settings_mut().baud_rate = 38_400;
        plc.save_settings(&path).unwrap();

        let mut other = MitsubishiSerialPlc::default();
        other.load_settings(&path).unwrap();
        assert_eq!(other.settings().baud_rate, 38_400);
    }
}
