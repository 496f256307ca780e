//! Device address encoding for MC protocol frames.
//!
//! ASCII frames carry an 8-character address: the device name padded to two
//! characters with `*`, then a 6-digit number (hex for X/Y/B/W-style devices,
//! decimal otherwise). Binary frames carry 3 address bytes, low byte first,
//! followed by the device code.
//!
//! Numbers wider than the 6-digit field keep only their low-order digits.

use super::device::Device;
use crate::packet::DeviceCode;
use crate::utils::fit_right;

/// ASCII address of `address + offset`, e.g. `"D*000100"`.
pub fn ascii_address(device: Device, address: u32, offset: u32) -> String {
    let number = address.wrapping_add(offset);
    let digits = if device.is_hex_addressed() {
        format!("{number:X}")
    } else {
        number.to_string()
    };
    let mut out = String::with_capacity(8);
    out.push_str(device.name());
    if out.len() == 1 {
        out.push('*');
    }
    out.push_str(&fit_right(&digits, 6, '0'));
    out
}

/// Binary address of `address + offset`: 3 bytes LE plus the device code.
pub fn binary_address(device: Device, address: u32, offset: u32) -> [u8; 4] {
    let number = address.wrapping_add(offset).to_le_bytes();
    [number[0], number[1], number[2], device.code() as u8]
}
