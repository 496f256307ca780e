//! MC protocol frame builder and parser.
//!
//! One [`MitsubishiProtocol`] covers the three dialects a Mitsubishi PLC
//! speaks here:
//!
//! | Dialect | Transport | Request | Reply delimiting |
//! |---------|-----------|---------|------------------|
//! | [`Dialect::Binary`] | TCP | 3E binary | whole read |
//! | [`Dialect::Ascii`] | TCP | 3E ASCII | whole read |
//! | [`Dialect::Serial`] | RS-232C/422 | 3C format 4 | CR LF |
//!
//! Commands used:
//!
//! | Command | Sub | Use |
//! |---------|-----|-----|
//! | `0401` | `0000` | batch read, one packet |
//! | `1401` | `0000` / `0001` | batch write, word / bit units |
//! | `0403` | `0000` | random read, several packets |
//! | `1402` | `0000` / `0001` | random write, word / bit units |
//!
//! Word data in ASCII frames is written high digit first per word (double
//! words per 4 bytes in random access); decoded payloads are always
//! little-endian per word.

use tracing::trace;

use super::address::{ascii_address, binary_address};
use super::device::Device;
use super::header::{Route, ACK, ENQ, ETX, HEADER_SIZE, NAK, STX};
use crate::checksum::sum_check;
use crate::error::{PlcError, Result};
use crate::packet::{ReceivingPacket, SendingPacket};
use crate::protocol::{Exchange, Expect, Protocol};
use crate::transport::Framing;
use crate::utils::{decode_hex, hex_grouped, pack_bit_units, swap_groups};
use crate::value::PlcValue;

const BATCH_READ: u16 = 0x0401;
const BATCH_WRITE: u16 = 0x1401;
const RANDOM_READ: u16 = 0x0403;
const RANDOM_WRITE: u16 = 0x1402;
const SUB_WORD: u16 = 0x0000;
const SUB_BIT: u16 = 0x0001;

/// Maximum entries the one-byte count fields of random commands allow.
pub const MAX_RANDOM_ITEMS: usize = 255;

/// Maximum words a batch read or batch write moves in one frame.
pub const MAX_BATCH_WORDS: usize = 960;

/// Maximum bit points a batch write moves in one frame.
pub const MAX_BATCH_POINTS: usize = 7168;

/// Wire encoding and transport of a Mitsubishi link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// 3E frame, binary, over TCP.
    Binary,
    /// 3E frame, ASCII, over TCP.
    Ascii,
    /// 3C frame format 4, ASCII, over a serial line.
    Serial,
}

/// Mitsubishi MC protocol.
#[derive(Debug, Clone)]
pub struct MitsubishiProtocol {
    dialect: Dialect,
    route: Route,
    timer: u16,
}

impl MitsubishiProtocol {
    /// Creates a protocol for `dialect` addressed through `route`.
    ///
    /// `timeout_ms` becomes the CPU monitoring timer in 250 ms units.
    pub fn new(dialect: Dialect, route: Route, timeout_ms: u32) -> Self {
        Self {
            dialect,
            route,
            timer: (timeout_ms / 250).min(u32::from(u16::MAX)) as u16,
        }
    }

    /// Dialect in use.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn body(&self) -> Body {
        Body {
            text: self.dialect != Dialect::Binary,
            bin: Vec::new(),
            ascii: String::new(),
        }
    }

    fn finish(&self, body: Body) -> Vec<u8> {
        match self.dialect {
            Dialect::Binary => {
                let mut frame = Vec::with_capacity(HEADER_SIZE + 4 + body.bin.len());
                frame.extend_from_slice(&self.route.request_bytes());
                frame.extend_from_slice(&((body.bin.len() + 2) as u16).to_le_bytes());
                frame.extend_from_slice(&self.timer.to_le_bytes());
                frame.extend_from_slice(&body.bin);
                frame
            }
            Dialect::Ascii => {
                let data = format!("{:04X}{}", self.timer, body.ascii);
                format!("{}{:04X}{}", self.route.request_text(), data.len(), data).into_bytes()
            }
            Dialect::Serial => {
                let text = format!("{}{}", self.route.serial_text(), body.ascii);
                let mut frame = Vec::with_capacity(text.len() + 5);
                frame.push(ENQ);
                frame.extend_from_slice(text.as_bytes());
                frame.extend_from_slice(sum_check(&text).as_bytes());
                frame.extend_from_slice(b"\r\n");
                frame
            }
        }
    }

    fn batch_write(&self, packet: &SendingPacket<Device>) -> Result<Exchange> {
        let mut body = self.body();
        if let Some(bits) = bit_points(packet) {
            if bits.is_empty() {
                return Err(PlcError::invalid_parameter("value", "no points to write"));
            }
            check_batch(bits.len(), MAX_BATCH_POINTS, "points")?;
            body.command(BATCH_WRITE, SUB_BIT);
            body.address(packet.device(), packet.address(), 0);
            body.count16(bits.len());
            body.bit_points(&bits);
        } else {
            let bytes = packet.value().to_le_bytes()?;
            check_batch(bytes.len() / 2, MAX_BATCH_WORDS, "words")?;
            body.command(BATCH_WRITE, SUB_WORD);
            body.address(packet.device(), packet.address(), 0);
            body.count16(bytes.len() / 2);
            body.words(&bytes);
        }
        Ok(Exchange::new(self.finish(body), Expect::Ack))
    }

    /// Booleans never share a frame with word values. Booleans bound for
    /// bit devices go out in bit units; booleans bound for word devices
    /// go out packed 16 per word in a word frame of their own.
    fn random_write(&self, packets: &[SendingPacket<Device>]) -> Result<Vec<Exchange>> {
        let (bools, values): (Vec<_>, Vec<_>) = packets.iter().partition(|p| p.value().is_bit());
        let (bit_units, packed): (Vec<_>, Vec<_>) =
            bools.into_iter().partition(|p| p.device().is_bit_device());
        let mut exchanges = Vec::with_capacity(3);

        if !bit_units.is_empty() {
            exchanges.push(self.random_bit_write(&bit_units)?);
        }
        for group in [packed, values] {
            if !group.is_empty() {
                exchanges.push(self.random_word_write(&group)?);
            }
        }
        Ok(exchanges)
    }

    fn random_bit_write(&self, packets: &[&SendingPacket<Device>]) -> Result<Exchange> {
        let mut entries = self.body();
        let mut count = 0usize;
        for packet in packets {
            let points = bit_points(packet).unwrap_or_default();
            for (i, state) in points.into_iter().enumerate() {
                entries.address(packet.device(), packet.address(), i as u32);
                entries.set_reset(state);
                count += 1;
            }
            check_capacity(count)?;
        }

        let mut body = self.body();
        body.command(RANDOM_WRITE, SUB_BIT);
        body.count8(count);
        body.append(entries);
        Ok(Exchange::new(self.finish(body), Expect::Ack))
    }

    fn random_word_write(&self, packets: &[&SendingPacket<Device>]) -> Result<Exchange> {
        let mut words = self.body();
        let mut dwords = self.body();
        let (mut word_count, mut dword_count) = (0usize, 0usize);
        for packet in packets {
            for unit in packet.value().word_units(packet.address())? {
                if unit.is_double() {
                    dwords.address(packet.device(), unit.address, 0);
                    dwords.dword(&unit.bytes);
                    dword_count += 1;
                } else {
                    words.address(packet.device(), unit.address, 0);
                    words.words(&unit.bytes);
                    word_count += 1;
                }
            }
            check_capacity(word_count + dword_count)?;
        }

        let mut body = self.body();
        body.command(RANDOM_WRITE, SUB_WORD);
        body.count8(word_count);
        body.count8(dword_count);
        body.append(words);
        body.append(dwords);
        Ok(Exchange::new(self.finish(body), Expect::Ack))
    }

    fn batch_read(&self, packet: &SendingPacket<Device>) -> Result<Exchange> {
        let count = usize::from(packet.word_count());
        check_batch(count, MAX_BATCH_WORDS, "words")?;
        let mut body = self.body();
        body.command(BATCH_READ, SUB_WORD);
        body.address(packet.device(), packet.address(), 0);
        body.count16(count);
        Ok(Exchange::new(self.finish(body), Expect::Words(count)))
    }

    fn random_read(&self, packets: &[SendingPacket<Device>]) -> Result<Exchange> {
        let mut words = self.body();
        let mut dwords = self.body();
        let (mut word_count, mut dword_count) = (0usize, 0usize);
        for packet in packets {
            let (dw, w) = split_words(packet.word_count());
            for i in 0..dw {
                dwords.address(packet.device(), packet.address(), 2 * i as u32);
            }
            if w > 0 {
                words.address(packet.device(), packet.address(), 2 * dw as u32);
            }
            dword_count += dw;
            word_count += w;
            check_capacity(word_count + dword_count)?;
        }

        let mut body = self.body();
        body.command(RANDOM_READ, SUB_WORD);
        body.count8(word_count);
        body.count8(dword_count);
        body.append(words);
        body.append(dwords);
        Ok(Exchange::new(
            self.finish(body),
            Expect::Mixed {
                words: word_count,
                dwords: dword_count,
            },
        ))
    }

    fn decode_binary(&self, expect: Expect, reply: &[u8]) -> Result<Vec<u8>> {
        if reply.len() < HEADER_SIZE + 4 {
            return Err(PlcError::framing(format!(
                "reply too short: {} bytes",
                reply.len()
            )));
        }
        if reply[..HEADER_SIZE] != self.route.response_bytes() {
            return Err(PlcError::framing(format!(
                "header mismatch: {}",
                hex::encode_upper(&reply[..HEADER_SIZE])
            )));
        }
        let length = usize::from(u16::from_le_bytes([reply[7], reply[8]]));
        if length != reply.len() - 9 {
            return Err(PlcError::framing(format!(
                "length field {length} but {} bytes follow",
                reply.len() - 9
            )));
        }
        let end_code = u16::from_le_bytes([reply[9], reply[10]]);
        if end_code != 0 {
            return Err(PlcError::nak(format!("{end_code:04X}")));
        }
        let data = &reply[11..];
        check_length(expect, data.len())?;
        Ok(data.to_vec())
    }

    fn decode_ascii(&self, expect: Expect, reply: &[u8]) -> Result<Vec<u8>> {
        let text = as_text(reply)?;
        let header = self.route.response_text();
        if text.len() < header.len() + 8 {
            return Err(PlcError::framing(format!("reply too short: '{text}'")));
        }
        if !text.starts_with(&header) {
            return Err(PlcError::framing(format!("header mismatch: '{text}'")));
        }
        let at = header.len();
        let length = usize::from_str_radix(&text[at..at + 4], 16)
            .map_err(|_| PlcError::framing(format!("invalid length field: '{text}'")))?;
        if length != text.len() - at - 4 {
            return Err(PlcError::framing(format!(
                "length field {length} but {} characters follow",
                text.len() - at - 4
            )));
        }
        let end_code = &text[at + 4..at + 8];
        if end_code != "0000" {
            return Err(PlcError::nak(end_code));
        }
        decode_ascii_data(expect, &text[at + 8..])
    }

    fn decode_serial(&self, expect: Expect, reply: &[u8]) -> Result<Vec<u8>> {
        let reply = reply.strip_suffix(b"\r\n").unwrap_or(reply);
        let (&control, rest) = reply
            .split_first()
            .ok_or_else(|| PlcError::framing("empty reply"))?;
        let text = as_text(rest)?;
        let header = self.route.serial_text();
        if !text.starts_with(&header) {
            return Err(PlcError::framing(format!("header mismatch: '{text}'")));
        }
        let after = &text[header.len()..];

        match control {
            STX => {
                let etx = after
                    .find(char::from(ETX))
                    .ok_or_else(|| PlcError::framing(format!("missing ETX: '{text}'")))?;
                let checked = &text[..header.len() + etx + 1];
                let sum = after.get(etx + 1..etx + 3).unwrap_or_default();
                if sum_check(checked) != sum {
                    return Err(PlcError::framing(format!(
                        "sum check mismatch: expected {}, got '{sum}'",
                        sum_check(checked)
                    )));
                }
                decode_ascii_data(expect, &after[..etx])
            }
            ACK => {
                check_length(expect, 0)?;
                Ok(Vec::new())
            }
            NAK => {
                let code = after
                    .get(..4)
                    .ok_or_else(|| PlcError::framing(format!("truncated NAK: '{text}'")))?;
                Err(PlcError::nak(code))
            }
            other => Err(PlcError::framing(format!(
                "unexpected control byte 0x{other:02X}"
            ))),
        }
    }
}

impl Protocol for MitsubishiProtocol {
    type Device = Device;

    fn framing(&self) -> Framing {
        match self.dialect {
            Dialect::Serial => Framing::Delimited(b"\r\n"),
            Dialect::Binary | Dialect::Ascii => Framing::Datagram,
        }
    }

    fn encode_write(&self, packets: &[SendingPacket<Device>]) -> Result<Vec<Exchange>> {
        match packets {
            [] => Err(PlcError::invalid_parameter("packets", "nothing to write")),
            [packet] => Ok(vec![self.batch_write(packet)?]),
            _ => self.random_write(packets),
        }
    }

    fn encode_read(&self, packets: &[SendingPacket<Device>]) -> Result<Vec<Exchange>> {
        if packets.iter().any(|p| p.word_count() == 0) {
            return Err(PlcError::invalid_parameter(
                "word_count",
                "must be greater than 0",
            ));
        }
        match packets {
            [] => Err(PlcError::invalid_parameter("packets", "nothing to read")),
            [packet] => Ok(vec![self.batch_read(packet)?]),
            _ => Ok(vec![self.random_read(packets)?]),
        }
    }

    fn decode_reply(&self, exchange: &Exchange, reply: &[u8]) -> Result<Vec<u8>> {
        trace!(dialect = ?self.dialect, reply = %hex::encode_upper(reply), "decoding reply");
        match self.dialect {
            Dialect::Binary => self.decode_binary(exchange.expect, reply),
            Dialect::Ascii => self.decode_ascii(exchange.expect, reply),
            Dialect::Serial => self.decode_serial(exchange.expect, reply),
        }
    }

    fn unpack_read(
        &self,
        packets: &[SendingPacket<Device>],
        payloads: Vec<Vec<u8>>,
    ) -> Result<Vec<ReceivingPacket<Device>>> {
        let payload = payloads
            .into_iter()
            .next()
            .ok_or_else(|| PlcError::framing("no reply payload"))?;

        if let [packet] = packets {
            return Ok(vec![ReceivingPacket::new(
                packet.device(),
                packet.address(),
                None,
                payload,
            )]);
        }

        let total_words: usize = packets.iter().map(|p| split_words(p.word_count()).1).sum();
        let (mut words, mut dwords) = payload.split_at(total_words * 2);
        let mut out = Vec::with_capacity(packets.len());
        for packet in packets {
            let (dw, w) = split_words(packet.word_count());
            let mut data = Vec::with_capacity(usize::from(packet.word_count()) * 2);
            let (head, tail) = dwords.split_at(dw * 4);
            data.extend_from_slice(head);
            dwords = tail;
            let (head, tail) = words.split_at(w * 2);
            data.extend_from_slice(head);
            words = tail;
            out.push(ReceivingPacket::new(packet.device(), packet.address(), None, data));
        }
        Ok(out)
    }
}

/// Boolean points of a packet bound for a bit device, `None` otherwise.
fn bit_points(packet: &SendingPacket<Device>) -> Option<Vec<bool>> {
    if !packet.device().is_bit_device() {
        return None;
    }
    match packet.value() {
        PlcValue::Bool(b) => Some(vec![*b]),
        PlcValue::Bools(bits) => Some(bits.clone()),
        _ => None,
    }
}

/// Double words and the trailing single word of a random-read span.
fn split_words(word_count: u16) -> (usize, usize) {
    let n = usize::from(word_count);
    (n / 2, n % 2)
}

fn check_capacity(count: usize) -> Result<()> {
    if count > MAX_RANDOM_ITEMS {
        return Err(PlcError::TooManyMessages { count });
    }
    Ok(())
}

fn check_batch(count: usize, limit: usize, unit: &str) -> Result<()> {
    if count > limit {
        return Err(PlcError::invalid_parameter(
            "value",
            format!("{count} {unit} exceed the batch limit of {limit}"),
        ));
    }
    Ok(())
}

fn check_length(expect: Expect, got: usize) -> Result<()> {
    if got != expect.byte_len() {
        return Err(PlcError::framing(format!(
            "expected {} data bytes, got {got}",
            expect.byte_len()
        )));
    }
    Ok(())
}

fn as_text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .ok()
        .filter(|t| t.is_ascii())
        .ok_or_else(|| PlcError::framing("reply is not ASCII"))
}

/// Converts ASCII reply data into little-endian word bytes.
fn decode_ascii_data(expect: Expect, data: &str) -> Result<Vec<u8>> {
    check_length(expect, data.len() / 2)?;
    let mut bytes = decode_hex(data)?;
    match expect {
        Expect::Mixed { words, .. } => {
            let (head, tail) = bytes.split_at_mut(words * 2);
            swap_groups(head, 2);
            swap_groups(tail, 4);
        }
        _ => swap_groups(&mut bytes, 2),
    }
    Ok(bytes)
}

/// Request body under construction, binary or ASCII.
struct Body {
    text: bool,
    bin: Vec<u8>,
    ascii: String,
}

impl Body {
    fn command(&mut self, command: u16, sub: u16) {
        if self.text {
            self.ascii.push_str(&format!("{command:04X}{sub:04X}"));
        } else {
            self.bin.extend_from_slice(&command.to_le_bytes());
            self.bin.extend_from_slice(&sub.to_le_bytes());
        }
    }

    fn address(&mut self, device: Device, address: u32, offset: u32) {
        if self.text {
            self.ascii.push_str(&ascii_address(device, address, offset));
        } else {
            self.bin.extend_from_slice(&binary_address(device, address, offset));
        }
    }

    fn count16(&mut self, count: usize) {
        let count = count as u16;
        if self.text {
            self.ascii.push_str(&format!("{count:04X}"));
        } else {
            self.bin.extend_from_slice(&count.to_le_bytes());
        }
    }

    fn count8(&mut self, count: usize) {
        let count = count as u8;
        if self.text {
            self.ascii.push_str(&format!("{count:02X}"));
        } else {
            self.bin.push(count);
        }
    }

    fn words(&mut self, bytes: &[u8]) {
        if self.text {
            self.ascii.push_str(&hex_grouped(bytes, 2));
        } else {
            self.bin.extend_from_slice(bytes);
        }
    }

    fn dword(&mut self, bytes: &[u8]) {
        if self.text {
            self.ascii.push_str(&hex_grouped(bytes, 4));
        } else {
            self.bin.extend_from_slice(bytes);
        }
    }

    fn bit_points(&mut self, bits: &[bool]) {
        if self.text {
            self.ascii
                .extend(bits.iter().map(|&b| if b { '1' } else { '0' }));
        } else {
            self.bin.extend(pack_bit_units(bits));
        }
    }

    fn set_reset(&mut self, state: bool) {
        if self.text {
            self.ascii.push_str(if state { "01" } else { "00" });
        } else {
            self.bin.push(u8::from(state));
        }
    }

    fn append(&mut self, other: Body) {
        self.bin.extend(other.bin);
        self.ascii.push_str(&other.ascii);
    }
}
