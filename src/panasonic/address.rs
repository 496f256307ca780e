//! Address encoding for MEWTOCOL frames.
//!
//! | Band | Single address | Span of `n` words |
//! |------|----------------|-------------------|
//! | Contact | name + 4 characters (`R0012`) | name + start word (4) + end word (4) |
//! | Data | | name + start (5) + end (5) |
//! | Index | name + `000000000` | |
//! | Binary | code, word LE, bit | code, word LE, count LE |
//!
//! Fields keep their rightmost digits when a number is too wide.

use super::device::{Band, Device};
use crate::error::{PlcError, Result};
use crate::packet::{DeviceCode, SendingPacket};
use crate::utils::fit_right;

fn invalid_code(device: Device) -> PlcError {
    PlcError::invalid_addressing(format!("Invalid device code - Code : {device:?}"))
}

fn check_offset(offset: i32) -> Result<u32> {
    if offset <= 0 {
        return Err(PlcError::invalid_parameter("offset", "Invalid offset value."));
    }
    Ok(offset as u32)
}

/// Single-point ASCII address: a contact or an index register.
pub fn ascii_point(packet: &SendingPacket<Device>) -> Result<String> {
    let device = packet.device();
    match device.band() {
        Band::Contact => {
            let point = match packet.contact_address() {
                Some(contact) => fit_right(contact, 4, '0'),
                None => fit_right(&packet.address().to_string(), 4, '0'),
            };
            Ok(format!("{}{point}", device.name()))
        }
        Band::Index => Ok(format!("{}000000000", device.name())),
        _ => Err(invalid_code(device)),
    }
}

/// ASCII address of `offset` words starting at the packet's word address.
pub fn ascii_span(packet: &SendingPacket<Device>, offset: i32) -> Result<String> {
    let device = packet.device();
    let (width, start) = match device.band() {
        Band::Contact => (4, packet.address()),
        Band::Data => (5, packet.address()),
        _ => return Err(invalid_code(device)),
    };
    let end = start.wrapping_add(check_offset(offset)? - 1);
    Ok(format!(
        "{}{}{}",
        device.name(),
        fit_right(&start.to_string(), width, '0'),
        fit_right(&end.to_string(), width, '0')
    ))
}

/// Binary contact address: code, word LE, bit number.
pub fn binary_contact(packet: &SendingPacket<Device>) -> Result<[u8; 4]> {
    let device = packet.device();
    if device.band() != Band::Binary {
        return Err(invalid_code(device));
    }
    let word = binary_word(packet)?.to_le_bytes();
    let bit = packet.contact_bit().unwrap_or(0);
    Ok([device.code() as u8, word[0], word[1], bit])
}

/// Binary data address: code, word LE, word count LE.
pub fn binary_data(packet: &SendingPacket<Device>, offset: i32) -> Result<[u8; 5]> {
    let device = packet.device();
    if device.band() != Band::Binary {
        return Err(invalid_code(device));
    }
    let count = i16::try_from(check_offset(offset)?)
        .map_err(|_| PlcError::invalid_parameter("offset", format!("{offset} words do not fit one frame")))?
        .to_le_bytes();
    let word = binary_word(packet)?.to_le_bytes();
    Ok([device.code() as u8, word[0], word[1], count[0], count[1]])
}

/// Word address of a binary frame, which carries 16 bits.
fn binary_word(packet: &SendingPacket<Device>) -> Result<u16> {
    u16::try_from(packet.address()).map_err(|_| {
        PlcError::invalid_addressing(format!(
            "{}{} is out of binary address range",
            packet.device().name(),
            packet.address()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_point_contact() {
        let p = SendingPacket::contact_write(Device::R, "12", true).unwrap();
        assert_eq!(ascii_point(&p).unwrap(), "R0012");

        let p = SendingPacket::write(Device::Y, 7, true);
        assert_eq!(ascii_point(&p).unwrap(), "Y0007");

        let p = SendingPacket::write(Device::C_L, 123_456, true);
        assert_eq!(ascii_point(&p).unwrap(), "L3456");
    }

    #[test]
    fn test_ascii_point_index() {
        let p = SendingPacket::write(Device::IX, 0, 1u16);
        assert_eq!(ascii_point(&p).unwrap(), "IX000000000");
    }

    #[test]
    fn test_ascii_point_rejects_data_band() {
        let p = SendingPacket::write(Device::D, 0, 1u16);
        assert!(matches!(
            ascii_point(&p),
            Err(PlcError::InvalidAddressing { .. })
        ));
    }

    #[test]
    fn test_ascii_span() {
        let p = SendingPacket::read(Device::D, 100, 2);
        assert_eq!(ascii_span(&p, 2).unwrap(), "D0010000101");

        let p = SendingPacket::read(Device::R, 3, 2);
        assert_eq!(ascii_span(&p, 2).unwrap(), "R00030004");

        let p = SendingPacket::read(Device::D, 123_456, 1);
        assert_eq!(ascii_span(&p, 1).unwrap(), "D2345623456");
    }

    #[test]
    fn test_ascii_span_offset() {
        let p = SendingPacket::read(Device::D, 0, 0);
        let err = ascii_span(&p, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'offset': Invalid offset value."
        );
        let p = SendingPacket::read(Device::IX, 0, 1);
        assert!(ascii_span(&p, 1).is_err());
    }

    #[test]
    fn test_binary_addresses() {
        let p = SendingPacket::contact_write(Device::WR, "1A", true).unwrap();
        assert_eq!(binary_contact(&p).unwrap(), [0x01, 0x01, 0x00, 0x0A]);

        let p = SendingPacket::read(Device::DT, 0x0102, 3);
        assert_eq!(binary_data(&p, 3).unwrap(), [0x09, 0x02, 0x01, 0x03, 0x00]);
        assert!(binary_data(&p, 0).is_err());

        let p = SendingPacket::read(Device::D, 0, 1);
        assert!(binary_data(&p, 1).is_err());
    }

    #[test]
    fn test_binary_ranges_checked() {
        let p = SendingPacket::read(Device::DT, 0, 1);
        assert!(binary_data(&p, i32::from(i16::MAX)).is_ok());
        assert!(matches!(
            binary_data(&p, 40_000),
            Err(PlcError::InvalidParameter { .. })
        ));

        let p = SendingPacket::read(Device::DT, 0x1_0000, 1);
        assert!(matches!(
            binary_data(&p, 1),
            Err(PlcError::InvalidAddressing { .. })
        ));

        let p = SendingPacket::write(Device::WR, 70_000, true);
        assert!(matches!(
            binary_contact(&p),
            Err(PlcError::InvalidAddressing { .. })
        ));
    }
}
