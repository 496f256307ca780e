//! Native values carried by write packets.
//!
//! [`PlcValue`] enumerates every payload shape the codecs accept. Each
//! value knows its device width ([`Width`]) and its little-endian word
//! image ([`PlcValue::to_le_bytes`]).
//!
//! | Value | Width | Words |
//! |-------|-------|:-----:|
//! | `Bool`, `Bools` | [`Width::Bit`] | 1 per 16 points |
//! | `Byte`, `I16`, `U16` | [`Width::Word`] | 1 |
//! | `I32`, `U32`, `F32` | [`Width::DoubleWord`] | 2 |
//! | `I64`, `U64`, `F64` | [`Width::QuadWord`] | 4 |
//! | `Text`, `Bytes` (≤ 2 bytes) | [`Width::Word`] | 1 |
//! | `Text`, `Bytes` (3–4 bytes) | [`Width::DoubleWord`] | 2 |
//! | `Text`, `Bytes` (longer) | [`Width::Block`] | ⌈len / 2⌉ |
//! | `List` | [`Width::Mixed`] | sum of elements |
//!
//! # Example
//!
//! ```
//! use plc_link::{PlcValue, Width};
//!
//! let v = PlcValue::from(1234i16);
//! assert_eq!(v.width(), Width::Word);
//! assert_eq!(v.to_le_bytes().unwrap(), vec![0xD2, 0x04]);
//!
//! let text = PlcValue::from("ABC");
//! assert_eq!(text.to_le_bytes().unwrap(), b"ABC\0".to_vec());
//! ```

use crate::error::{PlcError, Result};
use crate::utils::pack_word_bits;

/// A value to be written to PLC memory.
#[derive(Debug, Clone, PartialEq)]
pub enum PlcValue {
    /// Placeholder carried by read packets.
    Empty,
    /// Single bit.
    Bool(bool),
    /// Run of bits.
    Bools(Vec<bool>),
    /// One byte, written as a word with a zero high byte.
    Byte(u8),
    /// Signed 16-bit integer.
    I16(i16),
    /// Unsigned 16-bit integer.
    U16(u16),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// IEEE 754 single precision.
    F32(f32),
    /// IEEE 754 double precision.
    F64(f64),
    /// ASCII text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Heterogeneous sequence, encoded element by element.
    List(Vec<PlcValue>),
}

/// Device width class of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Boolean point(s).
    Bit,
    /// One 16-bit word.
    Word,
    /// Two consecutive words.
    DoubleWord,
    /// Four words, sent as two double words.
    QuadWord,
    /// Any number of words.
    Block(usize),
    /// Elements classified individually.
    Mixed,
}

/// One word or double word placed at a device address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordUnit {
    /// Word address of the unit.
    pub address: u32,
    /// Little-endian image, 2 or 4 bytes.
    pub bytes: Vec<u8>,
}

impl WordUnit {
    /// Returns `true` for a double-word unit.
    pub fn is_double(&self) -> bool {
        self.bytes.len() == 4
    }
}

impl PlcValue {
    /// Returns `true` for `Bool` and `Bools`.
    pub fn is_bit(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Bools(_))
    }

    /// Classifies the value by the device width it occupies.
    pub fn width(&self) -> Width {
        match self {
            Self::Bool(_) | Self::Bools(_) => Width::Bit,
            Self::Byte(_) | Self::I16(_) | Self::U16(_) => Width::Word,
            Self::I32(_) | Self::U32(_) | Self::F32(_) => Width::DoubleWord,
            Self::I64(_) | Self::U64(_) | Self::F64(_) => Width::QuadWord,
            Self::Text(s) => width_for_len(s.len()),
            Self::Bytes(b) => width_for_len(b.len()),
            Self::List(_) => Width::Mixed,
            Self::Empty => Width::Block(0),
        }
    }

    /// Encodes the value into whole words, low byte first.
    ///
    /// Odd-length text and byte runs get one trailing zero byte. Booleans
    /// pack 16 points per word.
    ///
    /// # Errors
    ///
    /// Returns [`PlcError::InvalidDataFormat`] for `Empty` (anywhere in a
    /// list) and for non-ASCII text.
    pub fn to_le_bytes(&self) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Empty => return Err(PlcError::invalid_data("Invalid data format.")),
            Self::Bool(b) => vec![u8::from(*b), 0x00],
            Self::Bools(bits) => pack_word_bits(bits),
            Self::Byte(b) => vec![*b, 0x00],
            Self::I16(v) => v.to_le_bytes().to_vec(),
            Self::U16(v) => v.to_le_bytes().to_vec(),
            Self::I32(v) => v.to_le_bytes().to_vec(),
            Self::U32(v) => v.to_le_bytes().to_vec(),
            Self::I64(v) => v.to_le_bytes().to_vec(),
            Self::U64(v) => v.to_le_bytes().to_vec(),
            Self::F32(v) => v.to_le_bytes().to_vec(),
            Self::F64(v) => v.to_le_bytes().to_vec(),
            Self::Text(s) => {
                if !s.is_ascii() {
                    return Err(PlcError::invalid_data(format!(
                        "text '{s}' is not ASCII"
                    )));
                }
                pad_even(s.as_bytes().to_vec())
            }
            Self::Bytes(b) => pad_even(b.clone()),
            Self::List(items) => {
                let mut out = Vec::new();
                for item in items {
                    out.extend(item.to_le_bytes()?);
                }
                out
            }
        };
        Ok(bytes)
    }

    /// Number of words [`to_le_bytes`](Self::to_le_bytes) produces.
    pub fn word_len(&self) -> Result<usize> {
        Ok(self.to_le_bytes()?.len() / 2)
    }

    /// Splits the value into word and double-word units starting at
    /// `address`.
    ///
    /// 64-bit values become two double words at `address` and
    /// `address + 2`; long text and byte runs become double words with a
    /// trailing word when the length is not a multiple of four. List
    /// elements are laid out back to back, each classified on its own.
    pub fn word_units(&self, address: u32) -> Result<Vec<WordUnit>> {
        let mut units = Vec::new();
        self.push_units(address, &mut units)?;
        Ok(units)
    }

    fn push_units(&self, address: u32, units: &mut Vec<WordUnit>) -> Result<u32> {
        if let Self::List(items) = self {
            let mut next = address;
            for item in items {
                next = item.push_units(next, units)?;
            }
            return Ok(next);
        }

        let bytes = self.to_le_bytes()?;
        match self.width() {
            Width::Word | Width::DoubleWord => {
                let words = bytes.len() as u32 / 2;
                units.push(WordUnit { address, bytes });
                Ok(address + words)
            }
            _ => {
                let mut next = address;
                for chunk in bytes.chunks(4) {
                    units.push(WordUnit {
                        address: next,
                        bytes: chunk.to_vec(),
                    });
                    next += chunk.len() as u32 / 2;
                }
                Ok(next)
            }
        }
    }
}

fn width_for_len(len: usize) -> Width {
    match len {
        0..=2 => Width::Word,
        3..=4 => Width::DoubleWord,
        n => Width::Block(n.div_ceil(2)),
    }
}

fn pad_even(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.len() % 2 != 0 {
        bytes.push(0x00);
    }
    bytes
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for PlcValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl From<Vec<$ty>> for PlcValue {
                fn from(v: Vec<$ty>) -> Self {
                    Self::List(v.into_iter().map(Self::$variant).collect())
                }
            }

            impl From<&[$ty]> for PlcValue {
                fn from(v: &[$ty]) -> Self {
                    Self::List(v.iter().copied().map(Self::$variant).collect())
                }
            }
        )*
    };
}

impl_from_scalar!(
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

impl From<bool> for PlcValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<bool>> for PlcValue {
    fn from(v: Vec<bool>) -> Self {
        Self::Bools(v)
    }
}

impl From<&[bool]> for PlcValue {
    fn from(v: &[bool]) -> Self {
        Self::Bools(v.to_vec())
    }
}

impl From<u8> for PlcValue {
    fn from(v: u8) -> Self {
        Self::Byte(v)
    }
}

impl From<Vec<u8>> for PlcValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for PlcValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<String> for PlcValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for PlcValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<char> for PlcValue {
    fn from(v: char) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<PlcValue>> for PlcValue {
    fn from(v: Vec<PlcValue>) -> Self {
        Self::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_classification() {
        assert_eq!(PlcValue::from(1u8).width(), Width::Word);
        assert_eq!(PlcValue::from(1u16).width(), Width::Word);
        assert_eq!(PlcValue::from(1.5f32).width(), Width::DoubleWord);
        assert_eq!(PlcValue::from(1u64).width(), Width::QuadWord);
        assert_eq!(PlcValue::from("AB").width(), Width::Word);
        assert_eq!(PlcValue::from("ABCD").width(), Width::DoubleWord);
        assert_eq!(PlcValue::from("ABCDE").width(), Width::Block(3));
        assert_eq!(PlcValue::from(vec![true]).width(), Width::Bit);
        assert_eq!(PlcValue::from(vec![1i16, 2]).width(), Width::Mixed);
    }

    #[test]
    fn test_scalar_bytes() {
        assert_eq!(PlcValue::from(0x12u8).to_le_bytes().unwrap(), vec![0x12, 0x00]);
        assert_eq!(
            PlcValue::from(-2i32).to_le_bytes().unwrap(),
            vec![0xFE, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            PlcValue::from(1.0f64).to_le_bytes().unwrap(),
            1.0f64.to_le_bytes().to_vec()
        );
        assert_eq!(PlcValue::from(true).to_le_bytes().unwrap(), vec![0x01, 0x00]);
    }

    #[test]
    fn test_odd_text_padded_at_end() {
        assert_eq!(PlcValue::from("A").to_le_bytes().unwrap(), vec![b'A', 0]);
        assert_eq!(
            PlcValue::from(vec![1u8, 2, 3]).to_le_bytes().unwrap(),
            vec![1, 2, 3, 0]
        );
    }

    #[test]
    fn test_list_concatenates() {
        let v = PlcValue::List(vec![PlcValue::from(1i16), PlcValue::from("AB")]);
        assert_eq!(v.to_le_bytes().unwrap(), vec![0x01, 0x00, b'A', b'B']);
        assert_eq!(v.word_len().unwrap(), 2);
    }

    #[test]
    fn test_invalid_formats() {
        assert!(matches!(
            PlcValue::Empty.to_le_bytes(),
            Err(PlcError::InvalidDataFormat { .. })
        ));
        assert!(matches!(
            PlcValue::from("é").to_le_bytes(),
            Err(PlcError::InvalidDataFormat { .. })
        ));
        let nested = PlcValue::List(vec![PlcValue::from(1i16), PlcValue::Empty]);
        assert!(nested.to_le_bytes().is_err());
    }

    #[test]
    fn test_word_units_quad_splits_in_two() {
        let units = PlcValue::from(0x0102_0304_0506_0708u64).word_units(100).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].address, 100);
        assert_eq!(units[0].bytes, vec![0x08, 0x07, 0x06, 0x05]);
        assert_eq!(units[1].address, 102);
        assert!(units.iter().all(WordUnit::is_double));
    }

    #[test]
    fn test_word_units_text_with_remainder() {
        let units = PlcValue::from("ABCDEF").word_units(10).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0], WordUnit { address: 10, bytes: b"ABCD".to_vec() });
        assert_eq!(units[1], WordUnit { address: 12, bytes: b"EF".to_vec() });
    }

    #[test]
    fn test_word_units_short_values() {
        let units = PlcValue::from("ABC").word_units(0).unwrap();
        assert_eq!(units, vec![WordUnit { address: 0, bytes: b"ABC\0".to_vec() }]);

        let units = PlcValue::from(7u16).word_units(5).unwrap();
        assert_eq!(units, vec![WordUnit { address: 5, bytes: vec![7, 0] }]);
    }

    #[test]
    fn test_word_units_list_advances_per_element() {
        let v = PlcValue::List(vec![
            PlcValue::from(1i16),
            PlcValue::from(2i32),
            PlcValue::from(3u16),
        ]);
        let units = v.word_units(200).unwrap();
        let layout: Vec<(u32, bool)> = units.iter().map(|u| (u.address, u.is_double())).collect();
        assert_eq!(layout, vec![(200, false), (201, true), (203, false)]);
    }
}
