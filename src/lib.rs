//! # PLC Link
//!
//! Client-side protocol stack for Mitsubishi and Panasonic PLCs.
//!
//! | Vendor | Protocol | Serial | TCP |
//! |--------|----------|:------:|:---:|
//! | Mitsubishi | MC protocol | 3C format 4 (ASCII) | 3E binary / ASCII |
//! | Panasonic | MEWTOCOL | MEWTOCOL-COM (ASCII) | binary / ASCII |
//!
//! Every request is a [`SendingPacket`] (device, address, value or word
//! count); every read result is a [`ReceivingPacket`] with typed accessors.
//! A [`Session`] owns the link, a reader thread and a health monitor that
//! reconnects after a cable pull.
//!
//! ## Quick Start
//!
//! ```no_run
//! use plc_link::mitsubishi::Device;
//! use plc_link::{MitsubishiSocketPlc, SendingPacket, SocketSetting};
//!
//! fn main() -> plc_link::Result<()> {
//!     let mut plc = MitsubishiSocketPlc::new(SocketSetting::new("192.168.10.100", 6000));
//!     plc.connect()?;
//!
//!     // D100 = 1234
//!     plc.write(&SendingPacket::write(Device::D, 100, 1234i16))?;
//!
//!     // read it back
//!     let reply = plc.read(&SendingPacket::read(Device::D, 100, 1))?;
//!     println!("D100 = {:?}", reply.to_i16s());
//!
//!     // several devices in one random-access frame
//!     let replies = plc.read_batch(&[
//!         SendingPacket::read(Device::D, 200, 2),
//!         SendingPacket::read(Device::W, 0x10, 1),
//!     ])?;
//!     println!("D200 = {:?}", replies[0].to_i32s());
//!
//!     plc.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! ## Panasonic
//!
//! ```no_run
//! use plc_link::panasonic::Device;
//! use plc_link::{PanasonicSerialPlc, SendingPacket, SerialSetting};
//!
//! let mut plc = PanasonicSerialPlc::new(SerialSetting::new("/dev/ttyUSB0", 9600).with_unit_no(1));
//! plc.connect()?;
//!
//! // contact R0012
//! plc.write(&SendingPacket::contact_write(Device::R, "12", true)?)?;
//!
//! // DT range through the data band
//! let reply = plc.read(&SendingPacket::read(Device::D, 100, 4))?;
//! println!("{:?}", reply.to_u16s());
//! # Ok::<(), plc_link::PlcError>(())
//! ```
//!
//! ## Values
//!
//! [`PlcValue`] is the payload of a write. Anything with a `From` impl can
//! be passed directly:
//!
//! ```
//! use plc_link::{PlcValue, Width};
//!
//! assert_eq!(PlcValue::from(1234i16).width(), Width::Word);
//! assert_eq!(PlcValue::from(1.5f32).width(), Width::DoubleWord);
//! assert_eq!(PlcValue::from(vec![true, false]).width(), Width::Bit);
//! assert_eq!(PlcValue::from(1234i16).to_le_bytes().unwrap(), vec![0xD2, 0x04]);
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`](Result). Framing and NAK errors are
//! never retried; connection errors are recovered by the health monitor.
//!
//! ```no_run
//! use plc_link::mitsubishi::Device;
//! use plc_link::{MitsubishiSocketPlc, PlcError, SendingPacket};
//!
//! let mut plc = MitsubishiSocketPlc::default();
//! plc.connect()?;
//!
//! match plc.read(&SendingPacket::read(Device::D, 0, 1)) {
//!     Ok(reply) => println!("{:?}", reply.to_u16s()),
//!     Err(PlcError::NegativeAcknowledgement { code }) => println!("PLC error {code}"),
//!     Err(e) if e.is_connection_error() => println!("link down: {e}"),
//!     Err(e) => println!("Error: {e}"),
//! }
//! # Ok::<(), PlcError>(())
//! ```
//!
//! ## Configuration
//!
//! Settings are plain data persisted as JSON:
//!
//! ```no_run
//! use plc_link::{MitsubishiSocketPlc, ProtocolFormat, SocketSetting};
//!
//! let setting = SocketSetting::new("192.168.10.100", 6000)
//!     .with_protocol_format(ProtocolFormat::Ascii) // default: binary
//!     .with_route(0x00, 0xFF)                      // network, PC number
//!     .with_timeout_ms(2000)                       // default: 1000
//!     .with_reconnect_count(5);                    // default: 0 (forever)
//!
//! let mut plc = MitsubishiSocketPlc::new(setting);
//! plc.save_settings("mitsubishi.json")?;
//! plc.load_settings("mitsubishi.json")?;
//! # Ok::<(), plc_link::PlcError>(())
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod checksum;
mod client;
mod correlation;
mod error;
pub mod mitsubishi;
mod packet;
pub mod panasonic;
mod protocol;
mod session;
pub mod settings;
pub mod transport;
pub mod utils;
mod value;

pub use client::{
    Link, MitsubishiSerial, MitsubishiSerialPlc, MitsubishiSocket, MitsubishiSocketPlc,
    PanasonicSerial, PanasonicSerialPlc, PanasonicSocket, PanasonicSocketPlc, Plc, Receiving,
    Sending,
};
pub use correlation::{Correlator, Reply};
pub use error::{PlcError, Result};
pub use packet::{DeviceCode, ReceivingPacket, SendingPacket};
pub use protocol::{Exchange, Expect, Protocol};
pub use session::{Session, SessionOptions, SessionState};
pub use settings::{Handshake, Parity, Persist, ProtocolFormat, SerialSetting, SocketSetting, StopBits};
pub use value::{PlcValue, Width, WordUnit};
