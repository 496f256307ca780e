//! Example: reading a Mitsubishi PLC over TCP
//!
//! Run with: cargo run --example mitsubishi_read -- 192.168.10.100 6000
//!
//! This example demonstrates:
//! - Connecting with socket settings (3E binary frames)
//! - A single batch read and a multi-range random read
//! - Projecting reply bytes onto integers, floats, text and bits

use plc_link::mitsubishi::Device;
use plc_link::{MitsubishiSocketPlc, SendingPacket, SocketSetting};

fn main() -> plc_link::Result<()> {
    let mut args = std::env::args().skip(1);
    let ip = args.next().unwrap_or_else(|| "192.168.10.100".to_string());
    let port = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6000);

    let mut plc = MitsubishiSocketPlc::new(SocketSetting::new(ip, port).with_reconnect_count(3));
    plc.connect()?;

    // One range: batch read (0401)
    let reply = plc.read(&SendingPacket::read(Device::D, 100, 4))?;
    println!("D100-D103 = {:?}", reply.to_i16s());
    println!("D100-D103 as f32 = {:?}", reply.to_f32s());

    // Several ranges: one random read (0403)
    let replies = plc.read_batch(&[
        SendingPacket::read(Device::D, 200, 2),
        SendingPacket::read(Device::W, 0x10, 5),
        SendingPacket::read(Device::M, 0, 1),
    ])?;
    println!("D200 (i32) = {}", replies[0].to_i32s()[0]);
    println!("W10-W14 (text) = {:?}", replies[1].to_ascii_string());
    let on: Vec<usize> = replies[2]
        .to_bools()
        .iter()
        .enumerate()
        .filter_map(|(i, &b)| b.then_some(i))
        .collect();
    println!("M0-M15 on = {on:?}");

    plc.disconnect();
    Ok(())
}
