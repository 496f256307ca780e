//! Request and reply packets.
//!
//! A [`SendingPacket`] names one device range and either carries a value to
//! write or a word count to read. A [`ReceivingPacket`] owns the bytes a read
//! returned and projects them into typed arrays on demand.
//!
//! Reply bytes are stored little-endian per word, the order both vendors use
//! for device memory. Every projection zero-pads a trailing partial unit.
//!
//! # Example
//!
//! ```
//! use plc_link::mitsubishi::Device;
//! use plc_link::{ReceivingPacket, SendingPacket};
//!
//! let write = SendingPacket::write(Device::D, 100, 1234i16);
//! assert!(!write.is_read());
//!
//! let reply = ReceivingPacket::new(Device::D, 100, None, vec![0xD2, 0x04]);
//! assert_eq!(reply.to_i16s(), vec![1234]);
//! ```

use std::fmt;

use crate::error::{PlcError, Result};
use crate::utils::{fit_right, unpack_word_bits};
use crate::value::PlcValue;

/// A vendor device code: a memory area with a wire code and a short name.
pub trait DeviceCode: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Numeric code used on the wire.
    fn code(self) -> u16;

    /// Short name used in ASCII addresses.
    fn name(self) -> &'static str;
}

/// One request: a device range plus the value to write or the words to read.
#[derive(Debug, Clone, PartialEq)]
pub struct SendingPacket<D> {
    device: D,
    address: u32,
    contact_address: Option<String>,
    is_read: bool,
    word_count: u16,
    value: PlcValue,
}

impl<D: DeviceCode> SendingPacket<D> {
    /// Reads `word_count` words starting at `address`.
    pub fn read(device: D, address: u32, word_count: u16) -> Self {
        Self {
            device,
            address,
            contact_address: None,
            is_read: true,
            word_count,
            value: PlcValue::Empty,
        }
    }

    /// Writes `value` starting at `address`.
    pub fn write(device: D, address: u32, value: impl Into<PlcValue>) -> Self {
        Self {
            device,
            address,
            contact_address: None,
            is_read: false,
            word_count: 0,
            value: value.into(),
        }
    }

    /// Reads from a Panasonic contact address such as `"0012"` (word 1, bit 2).
    ///
    /// # Errors
    ///
    /// Returns [`PlcError::InvalidAddressing`] when `contact` is not a
    /// decimal word number followed by one hex bit digit.
    pub fn contact_read(device: D, contact: &str, word_count: u16) -> Result<Self> {
        let (word, text) = parse_contact(contact)?;
        let mut packet = Self::read(device, word, word_count);
        packet.contact_address = Some(text);
        Ok(packet)
    }

    /// Writes `value` to a Panasonic contact address.
    pub fn contact_write(device: D, contact: &str, value: impl Into<PlcValue>) -> Result<Self> {
        let (word, text) = parse_contact(contact)?;
        let mut packet = Self::write(device, word, value);
        packet.contact_address = Some(text);
        Ok(packet)
    }

    /// Device code.
    pub fn device(&self) -> D {
        self.device
    }

    /// Word address (for contact packets, the word part of the contact).
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Four-character contact address, if this is a contact packet.
    pub fn contact_address(&self) -> Option<&str> {
        self.contact_address.as_deref()
    }

    /// Bit number within the word for contact packets.
    pub fn contact_bit(&self) -> Option<u8> {
        self.contact_address
            .as_deref()
            .and_then(|c| c.chars().last())
            .and_then(|c| c.to_digit(16))
            .map(|b| b as u8)
    }

    /// `true` for read requests.
    pub fn is_read(&self) -> bool {
        self.is_read
    }

    /// `true` when addressed by contact.
    pub fn is_contact(&self) -> bool {
        self.contact_address.is_some()
    }

    /// Words to read; zero for writes.
    pub fn word_count(&self) -> u16 {
        self.word_count
    }

    /// Value to write; [`PlcValue::Empty`] for reads.
    pub fn value(&self) -> &PlcValue {
        &self.value
    }
}

/// Splits `"0012"` into word 1 and the normalized contact text.
fn parse_contact(contact: &str) -> Result<(u32, String)> {
    let invalid = || PlcError::invalid_addressing(format!("invalid contact address '{contact}'"));
    if contact.is_empty() || !contact.is_ascii() {
        return Err(invalid());
    }
    let (word, bit) = contact.split_at(contact.len() - 1);
    if !bit.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let word = if word.is_empty() {
        0
    } else {
        word.parse::<u32>().map_err(|_| invalid())?
    };
    Ok((word, fit_right(&contact.to_ascii_uppercase(), 4, '0')))
}

/// Bytes returned by a read, tagged with the device range they came from.
#[derive(Clone, PartialEq, Eq)]
pub struct ReceivingPacket<D> {
    device: D,
    address: u32,
    contact_address: Option<String>,
    data: Vec<u8>,
}

impl<D: DeviceCode> ReceivingPacket<D> {
    /// Wraps reply bytes (little-endian words).
    pub fn new(device: D, address: u32, contact_address: Option<String>, data: Vec<u8>) -> Self {
        Self {
            device,
            address,
            contact_address,
            data,
        }
    }

    /// Device code of the range read.
    pub fn device(&self) -> D {
        self.device
    }

    /// First word address read.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Contact address, for contact reads.
    pub fn contact_address(&self) -> Option<&str> {
        self.contact_address.as_deref()
    }

    /// Raw reply bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the packet, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// 16 booleans per word, LSB first.
    pub fn to_bools(&self) -> Vec<bool> {
        unpack_word_bits(&self.data)
    }

    /// Signed 16-bit values.
    pub fn to_i16s(&self) -> Vec<i16> {
        self.units::<2>().into_iter().map(i16::from_le_bytes).collect()
    }

    /// Unsigned 16-bit values.
    pub fn to_u16s(&self) -> Vec<u16> {
        self.units::<2>().into_iter().map(u16::from_le_bytes).collect()
    }

    /// Signed 32-bit values.
    pub fn to_i32s(&self) -> Vec<i32> {
        self.units::<4>().into_iter().map(i32::from_le_bytes).collect()
    }

    /// Unsigned 32-bit values.
    pub fn to_u32s(&self) -> Vec<u32> {
        self.units::<4>().into_iter().map(u32::from_le_bytes).collect()
    }

    /// Signed 64-bit values.
    pub fn to_i64s(&self) -> Vec<i64> {
        self.units::<8>().into_iter().map(i64::from_le_bytes).collect()
    }

    /// Unsigned 64-bit values.
    pub fn to_u64s(&self) -> Vec<u64> {
        self.units::<8>().into_iter().map(u64::from_le_bytes).collect()
    }

    /// Single-precision floats.
    pub fn to_f32s(&self) -> Vec<f32> {
        self.units::<4>().into_iter().map(f32::from_le_bytes).collect()
    }

    /// Double-precision floats.
    pub fn to_f64s(&self) -> Vec<f64> {
        self.units::<8>().into_iter().map(f64::from_le_bytes).collect()
    }

    /// Reply bytes as characters, one per byte.
    pub fn to_ascii_string(&self) -> String {
        self.data.iter().map(|&b| char::from(b)).collect()
    }

    fn units<const N: usize>(&self) -> Vec<[u8; N]> {
        self.data
            .chunks(N)
            .map(|chunk| {
                let mut unit = [0u8; N];
                unit[..chunk.len()].copy_from_slice(chunk);
                unit
            })
            .collect()
    }
}

impl<D: DeviceCode> fmt::Debug for ReceivingPacket<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivingPacket")
            .field("device", &self.device)
            .field("address", &self.address)
            .field("contact_address", &self.contact_address)
            .field("data", &hex::encode_upper(&self.data))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panasonic::Device as Pana;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Dev;

    impl DeviceCode for Dev {
        fn code(self) -> u16 {
            0xA8
        }
        fn name(self) -> &'static str {
            "D"
        }
    }

    #[test]
    fn test_read_packet() {
        let p = SendingPacket::read(Dev, 100, 3);
        assert!(p.is_read());
        assert!(!p.is_contact());
        assert_eq!(p.word_count(), 3);
        assert_eq!(p.value(), &PlcValue::Empty);
    }

    #[test]
    fn test_write_packet() {
        let p = SendingPacket::write(Dev, 5, 7u16);
        assert!(!p.is_read());
        assert_eq!(p.word_count(), 0);
        assert_eq!(p.value(), &PlcValue::U16(7));
    }

    #[test]
    fn test_contact_parse() {
        let p = SendingPacket::contact_write(Pana::R, "12", true).unwrap();
        assert_eq!(p.address(), 1);
        assert_eq!(p.contact_address(), Some("0012"));
        assert_eq!(p.contact_bit(), Some(2));

        let p = SendingPacket::contact_read(Pana::Y, "10F", 1).unwrap();
        assert_eq!(p.address(), 10);
        assert_eq!(p.contact_address(), Some("010F"));
        assert_eq!(p.contact_bit(), Some(15));

        let p = SendingPacket::contact_read(Pana::Y, "A", 1).unwrap();
        assert_eq!(p.address(), 0);
        assert_eq!(p.contact_address(), Some("000A"));
    }

    #[test]
    fn test_contact_parse_rejects_garbage() {
        assert!(SendingPacket::contact_read(Pana::R, "", 1).is_err());
        assert!(SendingPacket::contact_read(Pana::R, "1G", 1).is_err());
        assert!(SendingPacket::contact_read(Pana::R, "X1", 1).is_err());
    }

    #[test]
    fn test_projections() {
        let data = [1.5f64.to_le_bytes(), (-2i64).to_le_bytes()].concat();
        let p = ReceivingPacket::new(Dev, 0, None, data);
        assert_eq!(p.to_f64s()[0], 1.5);
        assert_eq!(p.to_i64s()[1], -2);
        assert_eq!(p.to_u16s().len(), 8);
    }

    fn encoded(value: impl Into<PlcValue>) -> ReceivingPacket<Dev> {
        let bytes = value.into().to_le_bytes().unwrap();
        ReceivingPacket::new(Dev, 0, None, bytes)
    }

    #[test]
    fn test_values_survive_encode_and_decode() {
        assert_eq!(encoded(0xA5u8).to_u16s(), vec![0x00A5]);
        assert_eq!(encoded(-1234i16).to_i16s(), vec![-1234]);
        assert_eq!(encoded(0xBEEFu16).to_u16s(), vec![0xBEEF]);
        assert_eq!(encoded(-123_456i32).to_i32s(), vec![-123_456]);
        assert_eq!(encoded(0xDEAD_BEEFu32).to_u32s(), vec![0xDEAD_BEEF]);
        assert_eq!(encoded(i64::MIN + 7).to_i64s(), vec![i64::MIN + 7]);
        assert_eq!(encoded(u64::MAX - 1).to_u64s(), vec![u64::MAX - 1]);
        assert_eq!(encoded(-0.15625f32).to_f32s(), vec![-0.15625]);
        assert_eq!(encoded(6.02e23f64).to_f64s(), vec![6.02e23]);
        assert_eq!(encoded("PLC1").to_ascii_string(), "PLC1");
        assert_eq!(encoded(vec![7i32, -7]).to_i32s(), vec![7, -7]);

        let bits = vec![true, false, false, true, true];
        assert_eq!(encoded(bits.clone()).to_bools()[..5], bits[..]);
        assert!(encoded(true).to_bools()[0]);
    }

    #[test]
    fn test_partial_unit_zero_padded() {
        let p = ReceivingPacket::new(Dev, 0, None, vec![0x01, 0x00, 0x02]);
        assert_eq!(p.to_u16s(), vec![1, 2]);
        assert_eq!(p.to_u32s(), vec![0x0002_0001]);
        assert_eq!(p.to_bools().len(), 32);
    }

    #[test]
    fn test_ascii_and_bools() {
        let p = ReceivingPacket::new(Dev, 0, None, b"OK".to_vec());
        assert_eq!(p.to_ascii_string(), "OK");

        let p = ReceivingPacket::new(Dev, 0, None, vec![0x05, 0x80]);
        let bits = p.to_bools();
        assert!(bits[0] && !bits[1] && bits[2] && bits[15]);
    }

    #[test]
    fn test_debug_shows_hex() {
        let p = ReceivingPacket::new(Dev, 0, None, vec![0xAB, 0xCD]);
        assert!(format!("{p:?}").contains("ABCD"));
    }
}
