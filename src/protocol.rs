//! The framing strategy a [`Session`](crate::Session) is parameterized by.
//!
//! A [`Protocol`] turns packets into [`Exchange`]s (one outbound frame plus
//! what its reply must contain), validates reply frames, and reassembles
//! read payloads into [`ReceivingPacket`]s. It never touches I/O, so every
//! capacity or format failure surfaces before a byte is written.

use crate::error::Result;
use crate::packet::{DeviceCode, ReceivingPacket, SendingPacket};
use crate::transport::Framing;

/// Reply content a request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Acknowledgement without data.
    Ack,
    /// Contiguous words.
    Words(usize),
    /// Random read: `words` single words followed by `dwords` double words.
    Mixed {
        /// Single-word entries.
        words: usize,
        /// Double-word entries.
        dwords: usize,
    },
    /// One contact state.
    Bit,
}

impl Expect {
    /// Payload size in bytes once decoded.
    pub fn byte_len(self) -> usize {
        match self {
            Self::Ack => 0,
            Self::Words(n) => n * 2,
            Self::Mixed { words, dwords } => words * 2 + dwords * 4,
            Self::Bit => 1,
        }
    }
}

/// One request frame and the reply it expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Bytes to write, terminator included.
    pub frame: Vec<u8>,
    /// What the reply must carry.
    pub expect: Expect,
}

impl Exchange {
    /// Creates an exchange.
    pub fn new(frame: Vec<u8>, expect: Expect) -> Self {
        Self { frame, expect }
    }
}

/// Vendor dialect: frame builder and parser for one encoding and transport.
pub trait Protocol: Send + Sync + 'static {
    /// Device codes this dialect addresses.
    type Device: DeviceCode;

    /// How the transport delimits reply frames.
    fn framing(&self) -> Framing;

    /// Builds the frames for a write. Boolean and word data never share a
    /// frame.
    fn encode_write(&self, packets: &[SendingPacket<Self::Device>]) -> Result<Vec<Exchange>>;

    /// Builds the frames for a read.
    fn encode_read(&self, packets: &[SendingPacket<Self::Device>]) -> Result<Vec<Exchange>>;

    /// Validates a reply frame and extracts its payload as little-endian words.
    fn decode_reply(&self, exchange: &Exchange, reply: &[u8]) -> Result<Vec<u8>>;

    /// Splits decoded read payloads back into one packet per request.
    fn unpack_read(
        &self,
        packets: &[SendingPacket<Self::Device>],
        payloads: Vec<Vec<u8>>,
    ) -> Result<Vec<ReceivingPacket<Self::Device>>>;
}
