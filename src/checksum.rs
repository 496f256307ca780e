//! Frame check codes.
//!
//! | Vendor | Algorithm | Rendering |
//! |--------|-----------|-----------|
//! | Mitsubishi (3C serial) | sum of character codes, mod 256 | 2 uppercase hex digits |
//! | Panasonic (MEWTOCOL ASCII) | XOR of character codes (BCC) | 2 uppercase hex digits |
//!
//! # Example
//!
//! ```
//! use plc_link::checksum::{decode_bcc, encode_bcc, sum_check};
//!
//! let bcc = encode_bcc("%01#RDD0010000101");
//! assert!(decode_bcc("%01#RDD0010000101", &bcc));
//! assert_eq!(sum_check("AB"), "83");
//! ```

/// Mitsubishi sum check: low byte of the character-code sum.
pub fn sum_check(msg: &str) -> String {
    let sum = msg.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
    format!("{sum:02X}")
}

/// Panasonic block check character: XOR of every character code.
pub fn encode_bcc(msg: &str) -> String {
    let bcc = msg.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("{bcc:02X}")
}

/// Recomputes the BCC of `msg` and compares it with `bcc`.
pub fn decode_bcc(msg: &str, bcc: &str) -> bool {
    encode_bcc(msg) == bcc
}
