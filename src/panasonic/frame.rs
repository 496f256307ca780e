//! MEWTOCOL frame builder and parser.
//!
//! ASCII (MEWTOCOL-COM) frames, serial or TCP:
//!
//! ```text
//! %01#WCSR00121 xx\r     write contact R001.2 ON
//! %01#RDD0010000101 xx\r read DT100..DT101
//! %01$RD D204 0100 xx\r  reply data, low byte first per word
//! %01!42 xx\r            error 42
//! ```
//!
//! Binary frames (TCP only) start with `0x80` and a command byte:
//!
//! | Command | Use | Address |
//! |:-------:|-----|---------|
//! | `0x50` | word write | code, word LE, count LE |
//! | `0x51` | word read | code, word LE, count LE |
//! | `0x52` | contact write | code, word LE, bit |
//! | `0x53` | contact read | code, word LE, bit |
//!
//! Replies echo the command at byte 1 and carry a status byte at byte 2
//! (`0xFF` = success), then data.

use tracing::trace;

use super::address::{ascii_point, ascii_span, binary_contact, binary_data};
use super::device::{Band, Device};
use crate::checksum::{decode_bcc, encode_bcc};
use crate::error::{PlcError, Result};
use crate::packet::{ReceivingPacket, SendingPacket};
use crate::protocol::{Exchange, Expect, Protocol};
use crate::transport::Framing;
use crate::utils::decode_hex;
use crate::value::PlcValue;

const BINARY_PREFIX: u8 = 0x80;
const WORD_WRITE: u8 = 0x50;
const WORD_READ: u8 = 0x51;
const BIT_WRITE: u8 = 0x52;
const BIT_READ: u8 = 0x53;
const STATUS_OK: u8 = 0xFF;

/// Wire encoding of a Panasonic link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// MEWTOCOL binary, TCP only.
    Binary,
    /// MEWTOCOL-COM ASCII.
    Ascii,
}

/// Physical link the frames travel over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    /// Serial line; replies end with CR.
    Serial,
    /// TCP socket; one reply per read.
    Socket,
}

/// Panasonic MEWTOCOL protocol.
#[derive(Debug, Clone)]
pub struct PanasonicProtocol {
    format: Format,
    medium: Medium,
    unit_no: u8,
}

impl PanasonicProtocol {
    /// Creates a protocol addressing station `unit_no`.
    pub fn new(format: Format, medium: Medium, unit_no: u8) -> Self {
        Self {
            format,
            medium,
            unit_no,
        }
    }

    /// Wire encoding in use.
    pub fn format(&self) -> Format {
        self.format
    }

    fn ascii_frame(&self, command: &str) -> Vec<u8> {
        let msg = format!("%{:02}#{}", self.unit_no, command);
        let bcc = encode_bcc(&msg);
        format!("{msg}{bcc}\r").into_bytes()
    }

    fn ascii_write(&self, packet: &SendingPacket<Device>) -> Result<Exchange> {
        let device = packet.device();
        let command = match device.band() {
            Band::Contact => {
                if matches!(device, Device::T | Device::C | Device::X) {
                    return Err(PlcError::invalid_addressing(format!(
                        "{device} contacts are read-only"
                    )));
                }
                match packet.value() {
                    PlcValue::Bool(state) => {
                        format!("WCS{}{}", ascii_point(packet)?, u8::from(*state))
                    }
                    value => {
                        let bytes = value.to_le_bytes()?;
                        let span = ascii_span(packet, span_words(bytes.len())?)?;
                        format!("WCC{span}{}", hex::encode_upper(bytes))
                    }
                }
            }
            Band::Data => {
                let bytes = packet.value().to_le_bytes()?;
                let span = ascii_span(packet, span_words(bytes.len())?)?;
                format!("WD{span}{}", hex::encode_upper(bytes))
            }
            Band::Index => {
                let width = device.index_width().unwrap_or(4);
                let data = hex::encode_upper(packet.value().to_le_bytes()?);
                format!("WD{}{}", ascii_point(packet)?, fit_index(&data, width))
            }
            Band::Binary => {
                return Err(PlcError::invalid_addressing(format!(
                    "Invalid device code - Code : {device:?}"
                )))
            }
        };
        Ok(Exchange::new(self.ascii_frame(&command), Expect::Ack))
    }

    fn ascii_read(&self, packet: &SendingPacket<Device>) -> Result<Exchange> {
        let device = packet.device();
        let words = usize::from(packet.word_count());
        let (command, expect) = match device.band() {
            Band::Contact if packet.is_contact() => {
                (format!("RCS{}", ascii_point(packet)?), Expect::Bit)
            }
            Band::Contact => (
                format!("RCC{}", ascii_span(packet, i32::from(packet.word_count()))?),
                Expect::Words(words),
            ),
            Band::Data => (
                format!("RD{}", ascii_span(packet, i32::from(packet.word_count()))?),
                Expect::Words(words),
            ),
            Band::Index => (format!("RD{}", ascii_point(packet)?), Expect::Words(words)),
            Band::Binary => {
                return Err(PlcError::invalid_addressing(format!(
                    "Invalid device code - Code : {device:?}"
                )))
            }
        };
        Ok(Exchange::new(self.ascii_frame(&command), expect))
    }

    fn binary_write(&self, packet: &SendingPacket<Device>) -> Result<Exchange> {
        let mut frame = vec![BINARY_PREFIX];
        if packet.is_contact() {
            let state = match packet.value() {
                PlcValue::Bool(state) => *state,
                other => {
                    return Err(PlcError::invalid_data(format!(
                        "contact write needs a single bool, got {other:?}"
                    )))
                }
            };
            frame.push(BIT_WRITE);
            frame.extend_from_slice(&binary_contact(packet)?);
            frame.push(u8::from(state));
        } else {
            let bytes = packet.value().to_le_bytes()?;
            frame.push(WORD_WRITE);
            frame.extend_from_slice(&binary_data(packet, span_words(bytes.len())?)?);
            frame.extend_from_slice(&bytes);
        }
        Ok(Exchange::new(frame, Expect::Ack))
    }

    fn binary_read(&self, packet: &SendingPacket<Device>) -> Result<Exchange> {
        let mut frame = vec![BINARY_PREFIX];
        if packet.is_contact() {
            frame.push(BIT_READ);
            frame.extend_from_slice(&binary_contact(packet)?);
            frame.push(0x00);
            return Ok(Exchange::new(frame, Expect::Bit));
        }
        let words = usize::from(packet.word_count());
        frame.push(WORD_READ);
        frame.extend_from_slice(&binary_data(packet, i32::from(packet.word_count()))?);
        Ok(Exchange::new(frame, Expect::Words(words)))
    }

    fn decode_ascii(&self, expect: Expect, reply: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(reply)
            .ok()
            .filter(|t| t.is_ascii())
            .ok_or_else(|| PlcError::framing("reply is not ASCII"))?;
        let text = text.trim_end_matches('\r');
        if text.len() < 6 || !(text.starts_with('%') || text.starts_with('<')) {
            return Err(PlcError::framing(format!("Unsupported format: '{text}'")));
        }

        let unit = &text[1..3];
        let broadcast = unit == "FF";
        if !broadcast && unit != format!("{:02}", self.unit_no) {
            return Err(PlcError::framing(format!("unit number mismatch: '{text}'")));
        }
        if &text[3..4] == "!" {
            return Err(PlcError::nak(&text[4..6]));
        }

        let (body, bcc) = text.split_at(text.len() - 2);
        if !decode_bcc(body, bcc) {
            return Err(PlcError::framing(format!("Different BCC: '{text}'")));
        }
        if broadcast {
            return Ok(Vec::new());
        }

        match body.get(3..5) {
            Some("$R") => {
                let data = body.get(6..).unwrap_or_default();
                let bytes = match expect {
                    Expect::Bit => match data {
                        "0" => vec![0],
                        "1" => vec![1],
                        _ => return Err(PlcError::framing(format!("invalid contact state: '{text}'"))),
                    },
                    _ => decode_hex(data)?,
                };
                check_length(expect, bytes.len())?;
                Ok(bytes)
            }
            Some("$W") => {
                check_length(expect, 0)?;
                Ok(Vec::new())
            }
            _ => Err(PlcError::framing(format!("Unsupported format: '{text}'"))),
        }
    }

    fn decode_binary(&self, exchange: &Exchange, reply: &[u8]) -> Result<Vec<u8>> {
        if reply.len() < 3 {
            return Err(PlcError::framing(format!(
                "Wrong message type: {}",
                hex::encode_upper(reply)
            )));
        }
        if exchange.frame.get(1).is_some_and(|&cmd| cmd != reply[1]) {
            return Err(PlcError::framing(format!(
                "reply echoes command 0x{:02X}, sent 0x{:02X}",
                reply[1], exchange.frame[1]
            )));
        }
        if reply[2] != STATUS_OK {
            return Err(PlcError::nak(format!("{:02X}", reply[2])));
        }
        let data = &reply[3..];
        if exchange.expect == Expect::Bit {
            return data
                .first()
                .map(|&b| vec![b])
                .ok_or_else(|| PlcError::framing("missing contact state"));
        }
        check_length(exchange.expect, data.len())?;
        Ok(data.to_vec())
    }
}

impl Protocol for PanasonicProtocol {
    type Device = Device;

    fn framing(&self) -> Framing {
        match self.medium {
            Medium::Serial => Framing::Delimited(b"\r"),
            Medium::Socket => Framing::Datagram,
        }
    }

    fn encode_write(&self, packets: &[SendingPacket<Device>]) -> Result<Vec<Exchange>> {
        if packets.is_empty() {
            return Err(PlcError::invalid_parameter("packets", "nothing to write"));
        }
        let ordered = packets
            .iter()
            .filter(|p| p.value().is_bit())
            .chain(packets.iter().filter(|p| !p.value().is_bit()));
        ordered
            .map(|packet| match self.format {
                Format::Ascii => self.ascii_write(packet),
                Format::Binary => self.binary_write(packet),
            })
            .collect()
    }

    fn encode_read(&self, packets: &[SendingPacket<Device>]) -> Result<Vec<Exchange>> {
        if packets.is_empty() {
            return Err(PlcError::invalid_parameter("packets", "nothing to read"));
        }
        packets
            .iter()
            .map(|packet| {
                if !packet.is_contact() && packet.word_count() == 0 {
                    return Err(PlcError::invalid_parameter("offset", "Invalid offset value."));
                }
                match self.format {
                    Format::Ascii => self.ascii_read(packet),
                    Format::Binary => self.binary_read(packet),
                }
            })
            .collect()
    }

    fn decode_reply(&self, exchange: &Exchange, reply: &[u8]) -> Result<Vec<u8>> {
        trace!(format = ?self.format, reply = %hex::encode_upper(reply), "decoding reply");
        match self.format {
            Format::Ascii => self.decode_ascii(exchange.expect, reply),
            Format::Binary => self.decode_binary(exchange, reply),
        }
    }

    fn unpack_read(
        &self,
        packets: &[SendingPacket<Device>],
        payloads: Vec<Vec<u8>>,
    ) -> Result<Vec<ReceivingPacket<Device>>> {
        if payloads.len() != packets.len() {
            return Err(PlcError::framing(format!(
                "{} replies for {} requests",
                payloads.len(),
                packets.len()
            )));
        }
        Ok(packets
            .iter()
            .zip(payloads)
            .map(|(packet, data)| {
                ReceivingPacket::new(
                    packet.device(),
                    packet.address(),
                    packet.contact_address().map(str::to_owned),
                    data,
                )
            })
            .collect())
    }
}

/// Left-pads with zeros or keeps the leading `width` digits.
fn fit_index(data: &str, width: usize) -> String {
    if data.len() < width {
        format!("{data:0>width$}")
    } else {
        data[..width].to_owned()
    }
}

fn check_length(expect: Expect, got: usize) -> Result<()> {
    if got != expect.byte_len() {
        return Err(PlcError::framing(format!(
            "Different message length: expected {} bytes, got {got}",
            expect.byte_len()
        )));
    }
    Ok(())
}

/// Word count of an encoded payload.
fn span_words(byte_len: usize) -> Result<i32> {
    i32::try_from(byte_len / 2)
        .map_err(|_| PlcError::invalid_parameter("value", "payload too long for one frame"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii() -> PanasonicProtocol {
        PanasonicProtocol::new(Format::Ascii, Medium::Serial, 1)
    }

    fn binary() -> PanasonicProtocol {
        PanasonicProtocol::new(Format::Binary, Medium::Socket, 1)
    }

    fn reply(body: &str) -> Vec<u8> {
        format!("{body}{}\r", encode_bcc(body)).into_bytes()
    }

    fn text(ex: &Exchange) -> String {
        String::from_utf8(ex.frame.clone()).unwrap()
    }

    #[test]
    fn test_ascii_contact_bit_write() {
        let p = SendingPacket::contact_write(Device::R, "12", true).unwrap();
        let ex = ascii().encode_write(&[p]).unwrap();
        let msg = "%01#WCSR00121";
        assert_eq!(text(&ex[0]), format!("{msg}{}\r", encode_bcc(msg)));
    }

    #[test]
    fn test_ascii_contact_word_write() {
        let p = SendingPacket::write(Device::Y, 2, vec![true, false, true]);
        let ex = ascii().encode_write(&[p]).unwrap();
        assert!(text(&ex[0]).starts_with("%01#WCCY000200020500"));
    }

    #[test]
    fn test_read_only_contacts() {
        let p = SendingPacket::write(Device::X, 0, true);
        assert!(matches!(
            ascii().encode_write(&[p]),
            Err(PlcError::InvalidAddressing { .. })
        ));
    }

    #[test]
    fn test_ascii_data_write() {
        let p = SendingPacket::write(Device::D, 100, vec![1234i16, 1]);
        let ex = ascii().encode_write(&[p]).unwrap();
        assert!(text(&ex[0]).starts_with("%01#WDD0010000101D2040100"));
    }

    #[test]
    fn test_ascii_index_write_widths() {
        let p = SendingPacket::write(Device::IX, 0, 0x12u8);
        let ex = ascii().encode_write(&[p]).unwrap();
        assert!(text(&ex[0]).starts_with("%01#WDIX0000000001200"));

        let p = SendingPacket::write(Device::ID, 0, 0x0102_0304u32);
        let ex = ascii().encode_write(&[p]).unwrap();
        assert!(text(&ex[0]).starts_with("%01#WDID00000000004030201"));

        let p = SendingPacket::write(Device::IY, 0, 0x0102_0304u32);
        let ex = ascii().encode_write(&[p]).unwrap();
        assert!(text(&ex[0]).starts_with("%01#WDIY0000000000403"));
        assert_eq!(fit_index("1", 4), "0001");
    }

    #[test]
    fn test_binary_band_rejected_in_ascii() {
        let p = SendingPacket::write(Device::DT, 0, 1u16);
        assert!(matches!(
            ascii().encode_write(&[p]),
            Err(PlcError::InvalidAddressing { .. })
        ));
    }

    #[test]
    fn test_write_orders_bits_first() {
        let packets = [
            SendingPacket::write(Device::D, 0, 5u16),
            SendingPacket::write(Device::R, 1, true),
        ];
        let ex = ascii().encode_write(&packets).unwrap();
        assert_eq!(ex.len(), 2);
        assert!(text(&ex[0]).starts_with("%01#WCS"));
        assert!(text(&ex[1]).starts_with("%01#WDD"));
    }

    #[test]
    fn test_ascii_reads() {
        let ex = ascii()
            .encode_read(&[
                SendingPacket::read(Device::D, 100, 2),
                SendingPacket::contact_read(Device::X, "1F", 1).unwrap(),
                SendingPacket::read(Device::R, 0, 1),
            ])
            .unwrap();
        assert!(text(&ex[0]).starts_with("%01#RDD0010000101"));
        assert_eq!(ex[0].expect, Expect::Words(2));
        assert!(text(&ex[1]).starts_with("%01#RCSX001F"));
        assert_eq!(ex[1].expect, Expect::Bit);
        assert!(text(&ex[2]).starts_with("%01#RCCR00000000"));
    }

    #[test]
    fn test_zero_word_read_rejected() {
        let err = ascii()
            .encode_read(&[SendingPacket::read(Device::D, 0, 0)])
            .unwrap_err();
        assert!(matches!(err, PlcError::InvalidParameter { .. }));
    }

    #[test]
    fn test_ascii_reply_data() {
        let proto = ascii();
        let ex = Exchange::new(Vec::new(), Expect::Words(2));
        let data = proto.decode_reply(&ex, &reply("%01$RDD2040100")).unwrap();
        assert_eq!(data, vec![0xD2, 0x04, 0x01, 0x00]);

        let bit = Exchange::new(Vec::new(), Expect::Bit);
        assert_eq!(proto.decode_reply(&bit, &reply("%01$RC1")).unwrap(), vec![1]);

        let ack = Exchange::new(Vec::new(), Expect::Ack);
        assert!(proto.decode_reply(&ack, &reply("%01$WD")).unwrap().is_empty());
        assert!(proto.decode_reply(&ack, &reply("%FF$WD")).unwrap().is_empty());
    }

    #[test]
    fn test_ascii_reply_errors() {
        let proto = ascii();
        let ex = Exchange::new(Vec::new(), Expect::Words(1));

        let err = proto.decode_reply(&ex, &reply("%01!42")).unwrap_err();
        assert!(matches!(err, PlcError::NegativeAcknowledgement { ref code } if code == "42"));

        let err = proto.decode_reply(&ex, &reply("%02$RDD204")).unwrap_err();
        assert!(matches!(err, PlcError::Framing { .. }));

        let err = proto.decode_reply(&ex, b"%01$RDD20400\r").unwrap_err();
        assert!(matches!(err, PlcError::Framing { .. }));

        let err = proto.decode_reply(&ex, &reply("%01$RDD2040100")).unwrap_err();
        assert!(matches!(err, PlcError::Framing { .. }));

        let err = proto.decode_reply(&ex, &reply("%01$XX")).unwrap_err();
        assert!(matches!(err, PlcError::Framing { .. }));
    }

    #[test]
    fn test_binary_frames() {
        let proto = binary();
        let p = SendingPacket::write(Device::DT, 100, 1234i16);
        let ex = proto.encode_write(&[p]).unwrap();
        assert_eq!(hex::encode_upper(&ex[0].frame), "80500964000100D204");

        let p = SendingPacket::contact_write(Device::WR, "3", true).unwrap();
        let ex = proto.encode_write(&[p]).unwrap();
        assert_eq!(ex[0].frame, vec![0x80, 0x52, 0x01, 0x00, 0x00, 0x03, 0x01]);

        let p = SendingPacket::contact_write(Device::WR, "3", 1u16).unwrap();
        assert!(matches!(
            proto.encode_write(&[p]),
            Err(PlcError::InvalidDataFormat { .. })
        ));

        let p = SendingPacket::read(Device::DT, 0, 2);
        let ex = proto.encode_read(&[p]).unwrap();
        assert_eq!(ex[0].frame, vec![0x80, 0x51, 0x09, 0x00, 0x00, 0x02, 0x00]);

        let p = SendingPacket::contact_read(Device::WY, "10", 1).unwrap();
        let ex = proto.encode_read(&[p]).unwrap();
        assert_eq!(ex[0].frame, vec![0x80, 0x53, 0x02, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_binary_write_length_checked() {
        let p = SendingPacket::write(Device::DT, 0, vec![0u16; 40_000]);
        assert!(matches!(
            binary().encode_write(&[p]),
            Err(PlcError::InvalidParameter { .. })
        ));

        let p = SendingPacket::write(Device::DT, 70_000, 1u16);
        assert!(matches!(
            binary().encode_write(&[p]),
            Err(PlcError::InvalidAddressing { .. })
        ));
    }

    #[test]
    fn test_binary_replies() {
        let proto = binary();
        let ex = Exchange::new(vec![0x80, 0x51], Expect::Words(1));
        assert_eq!(
            proto.decode_reply(&ex, &[0x80, 0x51, 0xFF, 0xD2, 0x04]).unwrap(),
            vec![0xD2, 0x04]
        );

        let err = proto.decode_reply(&ex, &[0x80, 0x51, 0x21]).unwrap_err();
        assert!(matches!(err, PlcError::NegativeAcknowledgement { ref code } if code == "21"));

        let err = proto.decode_reply(&ex, &[0x80, 0x50, 0xFF, 0xD2, 0x04]).unwrap_err();
        assert!(matches!(err, PlcError::Framing { .. }));

        let err = proto.decode_reply(&ex, &[0x80, 0x51]).unwrap_err();
        assert!(matches!(err, PlcError::Framing { .. }));

        let bit = Exchange::new(vec![0x80, 0x53], Expect::Bit);
        assert_eq!(proto.decode_reply(&bit, &[0x80, 0x53, 0xFF, 0x01]).unwrap(), vec![1]);
    }

    #[test]
    fn test_unpack_keeps_contact() {
        let proto = ascii();
        let packets = [SendingPacket::contact_read(Device::R, "12", 1).unwrap()];
        let out = proto.unpack_read(&packets, vec![vec![1]]).unwrap();
        assert_eq!(out[0].contact_address(), Some("0012"));
        assert!(proto.unpack_read(&packets, vec![]).is_err());
    }

    #[test]
    fn test_framing_per_medium() {
        assert_eq!(ascii().framing(), Framing::Delimited(b"\r"));
        assert_eq!(binary().framing(), Framing::Datagram);
    }
}
