//! Bit packing and hex text helpers shared by both vendors.
//!
//! Both Mitsubishi and Panasonic store boolean runs in 16-bit words with
//! element `i` of a run landing in bit `i % 16` of word `i / 16`, low byte
//! first on the wire. Mitsubishi's binary bit-unit commands use a different
//! layout (two points per byte, see [`pack_bit_units`]).
//!
//! # Example
//!
//! ```
//! use plc_link::utils::{pack_word_bits, unpack_word_bits};
//!
//! let bits = [true, false, true];
//! let bytes = pack_word_bits(&bits);
//! assert_eq!(bytes, vec![0b0000_0101, 0x00]);
//!
//! let back = unpack_word_bits(&bytes);
//! assert_eq!(back.len(), 16);
//! assert_eq!(&back[..3], &bits);
//! ```

use crate::error::{PlcError, Result};

/// Gets a single bit from a 16-bit word (0 is the LSB).
#[inline]
pub fn get_bit(value: u16, bit: u8) -> bool {
    (value & (1 << bit)) != 0
}

/// Returns `value` with bit `bit` set to `state`.
#[inline]
pub fn set_bit(value: u16, bit: u8, state: bool) -> u16 {
    if state {
        value | (1 << bit)
    } else {
        value & !(1 << bit)
    }
}

/// Expands a word into its 16 bits, LSB first.
pub fn word_to_bits(value: u16) -> [bool; 16] {
    let mut bits = [false; 16];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = get_bit(value, i as u8);
    }
    bits
}

/// Packs a boolean run into whole words, low byte first.
///
/// The output always has an even length; a partial trailing word is padded
/// with `false`.
pub fn pack_word_bits(bits: &[bool]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bits.len().div_ceil(16) * 2);
    for chunk in bits.chunks(16) {
        let mut word = 0u16;
        for (i, &bit) in chunk.iter().enumerate() {
            word = set_bit(word, i as u8, bit);
        }
        out.extend_from_slice(&word.to_le_bytes());
    }
    out
}

/// Inverse of [`pack_word_bits`]; yields 16 bits per word.
///
/// A trailing odd byte is treated as the low half of a zero-padded word.
pub fn unpack_word_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .chunks(2)
        .flat_map(|c| {
            let word = u16::from_le_bytes([c[0], c.get(1).copied().unwrap_or(0)]);
            word_to_bits(word)
        })
        .collect()
}

/// Packs points for Mitsubishi binary bit-unit commands: two points per
/// byte, the first point in the high nibble.
pub fn pack_bit_units(bits: &[bool]) -> Vec<u8> {
    bits.chunks(2)
        .map(|pair| {
            let hi = if pair[0] { 0x10 } else { 0x00 };
            let lo = match pair.get(1) {
                Some(true) => 0x01,
                _ => 0x00,
            };
            hi | lo
        })
        .collect()
}

/// Renders bytes as uppercase hex, reversing each `group`-sized run.
///
/// With `group == 2` a little-endian word buffer becomes the big-endian
/// text Mitsubishi ASCII frames carry; `group == 4` does the same per
/// double word. A trailing partial group is reversed as-is.
pub fn hex_grouped(bytes: &[u8], group: usize) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for chunk in bytes.chunks(group.max(1)) {
        let reversed: Vec<u8> = chunk.iter().rev().copied().collect();
        out.push_str(&hex::encode_upper(reversed));
    }
    out
}

/// Parses hex text into bytes, mapping failures to a framing error.
pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|e| PlcError::framing(format!("invalid hex payload '{text}': {e}")))
}

/// Reverses every `group`-sized run in place.
pub fn swap_groups(bytes: &mut [u8], group: usize) {
    for chunk in bytes.chunks_mut(group.max(1)) {
        chunk.reverse();
    }
}

/// Keeps the rightmost `width` characters of `text`, left-padding with
/// `pad` when it is shorter.
///
/// Address fields use this; an out-of-range address silently loses its
/// high-order digits.
pub fn fit_right(text: &str, width: usize, pad: char) -> String {
    let len = text.chars().count();
    if len >= width {
        text.chars().skip(len - width).collect()
    } else {
        let mut out: String = std::iter::repeat(pad).take(width - len).collect();
        out.push_str(text);
        out
    }
}
