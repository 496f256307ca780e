//! Byte transports and reply reassembly.
//!
//! The transport layer only knows about streams and bytes:
//!
//! - [`Connector`] opens a duplex byte stream ([`TcpConnector`] over
//!   `std::net`, [`SerialConnector`] over the `serialport` crate)
//! - [`FrameAssembler`] turns the incoming byte stream into reply frames
//!   according to a [`Framing`] rule
//!
//! Both connectors configure a short read timeout ([`POLL_INTERVAL`]) so the
//! session reader can notice cancellation between reads.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{PlcError, Result};
use crate::settings::{Handshake, Parity, SerialSetting, SocketSetting, StopBits};

/// Read timeout of every transport, and the polling period of session loops.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chunk size of socket reads; a full chunk means more bytes may follow.
pub const READ_CHUNK: usize = 256;

/// How reply frames are delimited in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Frames end with a terminator (serial lines). The terminator is
    /// stripped from delivered frames.
    Delimited(&'static [u8]),
    /// Each read is a frame; a read that fills the whole chunk is continued
    /// by the next one (sockets).
    Datagram,
}

/// Reassembles reply frames from the received byte stream.
#[derive(Debug)]
pub struct FrameAssembler {
    framing: Framing,
    buffer: Vec<u8>,
}

impl FrameAssembler {
    /// Creates an empty assembler.
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::new(),
        }
    }

    /// Feeds one read of `chunk_size` capacity; returns completed frames.
    pub fn push(&mut self, bytes: &[u8], chunk_size: usize) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(bytes);
        match self.framing {
            Framing::Delimited(terminator) => self.split(terminator),
            Framing::Datagram if bytes.len() < chunk_size => vec![std::mem::take(&mut self.buffer)],
            Framing::Datagram => Vec::new(),
        }
    }

    /// Called when a read timed out; flushes a datagram that ended exactly
    /// on a chunk boundary.
    pub fn idle(&mut self) -> Option<Vec<u8>> {
        match self.framing {
            Framing::Datagram if !self.buffer.is_empty() => Some(std::mem::take(&mut self.buffer)),
            _ => None,
        }
    }

    /// Drops partial data.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    fn split(&mut self, terminator: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        if terminator.is_empty() {
            return frames;
        }
        while let Some(pos) = self
            .buffer
            .windows(terminator.len())
            .position(|w| w == terminator)
        {
            let frame: Vec<u8> = self.buffer.drain(..pos + terminator.len()).take(pos).collect();
            frames.push(frame);
        }
        frames
    }
}

/// An open duplex byte stream.
pub struct Connection {
    /// Receiving half, owned by the session reader.
    pub reader: Box<dyn Read + Send>,
    /// Sending half.
    pub writer: Box<dyn Write + Send>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens byte streams to a PLC.
pub trait Connector: Send + Sync {
    /// Opens a new stream. Every call yields a fresh connection.
    fn connect(&self) -> Result<Connection>;

    /// Human-readable endpoint, for logs.
    fn endpoint(&self) -> String;
}

/// TCP client connector.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnector {
    /// Creates a connector for `host:port` with a connect timeout.
    ///
    /// Sockets reject zero timeouts, so the timeout is at least 1 ms.
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: timeout.max(Duration::from_millis(1)),
        }
    }

    /// Creates a connector from socket settings.
    pub fn from_setting(setting: &SocketSetting) -> Self {
        Self::new(
            setting.ip.clone(),
            setting.port,
            Duration::from_millis(u64::from(setting.timeout_ms)),
        )
    }

    fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| PlcError::invalid_parameter("ip", format!("cannot resolve '{}'", self.host)))
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> Result<Connection> {
        let addr = self.resolve()?;
        let stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(POLL_INTERVAL))?;
        stream.set_write_timeout(Some(self.timeout))?;
        let reader = stream.try_clone()?;
        debug!(%addr, "tcp connected");
        Ok(Connection {
            reader: Box::new(reader),
            writer: Box::new(stream),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Serial port connector.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    setting: SerialSetting,
}

impl SerialConnector {
    /// Creates a connector from serial settings.
    pub fn new(setting: SerialSetting) -> Self {
        Self { setting }
    }
}

impl Connector for SerialConnector {
    fn connect(&self) -> Result<Connection> {
        let s = &self.setting;
        let data_bits = match s.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => {
                return Err(PlcError::invalid_parameter(
                    "data_bits",
                    format!("{other} is not in 5..=8"),
                ))
            }
        };
        let parity = match s.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };
        let stop_bits = match s.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        };
        let flow_control = match s.handshake {
            Handshake::None => serialport::FlowControl::None,
            Handshake::XonXoff => serialport::FlowControl::Software,
            Handshake::RequestToSend => serialport::FlowControl::Hardware,
        };

        let port = serialport::new(s.port_name.as_str(), s.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(flow_control)
            .timeout(POLL_INTERVAL)
            .open()?;
        let reader = port.try_clone()?;
        debug!(port = %s.port_name, baud = s.baud_rate, "serial port opened");
        Ok(Connection {
            reader: Box::new(reader),
            writer: Box::new(port),
        })
    }

    fn endpoint(&self) -> String {
        self.setting.port_name.clone()
    }
}
