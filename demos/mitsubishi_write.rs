//! Example: writing to a Mitsubishi PLC over TCP in ASCII frames
//!
//! Run with: cargo run --example mitsubishi_write -- 192.168.10.100 6000
//!
//! This example demonstrates:
//! - Selecting the ASCII dialect
//! - Batch writes of words and of bit points
//! - A random write that mixes booleans and words (sent as separate frames)
//! - Saving the settings for the next run

use plc_link::mitsubishi::Device;
use plc_link::{MitsubishiSocketPlc, ProtocolFormat, SendingPacket, SocketSetting};

fn main() -> plc_link::Result<()> {
    let mut args = std::env::args().skip(1);
    let ip = args.next().unwrap_or_else(|| "192.168.10.100".to_string());
    let port = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6000);

    let settings = SocketSetting::new(ip, port).with_protocol_format(ProtocolFormat::Ascii);
    let mut plc = MitsubishiSocketPlc::new(settings);
    plc.connect()?;

    // Batch write, word units
    plc.write(&SendingPacket::write(Device::D, 100, vec![1i16, 2, 3]))?;
    // Batch write, bit units
    plc.write(&SendingPacket::write(Device::Y, 0x20, vec![true, false, true]))?;

    // Random write: one frame for M0, one for the words
    plc.write_batch(&[
        SendingPacket::write(Device::M, 0, true),
        SendingPacket::write(Device::D, 300, 123_456i32),
        SendingPacket::write(Device::D, 310, "LOT-42"),
    ])?;

    let check = plc.read(&SendingPacket::read(Device::D, 100, 3))?;
    println!("D100-D102 = {:?}", check.to_i16s());

    plc.save_default_settings()?;
    plc.disconnect();
    Ok(())
}
