//! Example: talking MEWTOCOL-COM to a Panasonic PLC on a serial port
//!
//! Run with: cargo run --example panasonic_serial -- /dev/ttyUSB0 9600
//!
//! This example demonstrates:
//! - Serial settings (line format, unit number)
//! - Contact writes and reads (WCS/RCS)
//! - Data register writes and reads (WD/RD)
//! - Watching the link state and the fatal reconnect message

use std::thread;
use std::time::Duration;

use plc_link::panasonic::Device;
use plc_link::{Parity, PanasonicSerialPlc, SendingPacket, SerialSetting, StopBits};

fn main() -> plc_link::Result<()> {
    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    let baud = args
        .next()
        .and_then(|b| b.parse().ok())
        .unwrap_or(9600);

    let settings = SerialSetting::new(port, baud)
        .with_line(8, Parity::Odd, StopBits::One)
        .with_unit_no(1)
        .with_reconnect_count(5);
    let mut plc = PanasonicSerialPlc::new(settings);
    plc.connect()?;

    plc.write(&SendingPacket::contact_write(Device::R, "10", true)?)?;
    let r10 = plc.read(&SendingPacket::contact_read(Device::R, "10", 1)?)?;
    println!("R10 = {}", r10.to_bools()[0]);

    plc.write(&SendingPacket::write(Device::DT, 0, vec![10u16, 20, 30]))?;
    let dt = plc.read(&SendingPacket::read(Device::DT, 0, 3))?;
    println!("DT0-DT2 = {:?}", dt.to_u16s());

    for _ in 0..10 {
        if let Some(reason) = plc.fatal_error() {
            eprintln!("{reason}");
            break;
        }
        println!("state: {:?}", plc.state());
        thread::sleep(Duration::from_secs(1));
    }

    plc.disconnect();
    Ok(())
}
