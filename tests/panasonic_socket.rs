mod common;

use common::{Behavior, FakePlc};
use plc_link::panasonic::Device;
use plc_link::{PanasonicSocketPlc, PlcError, ProtocolFormat, SendingPacket, SocketSetting};

fn connect(fake: &FakePlc) -> PanasonicSocketPlc {
    let setting = SocketSetting::new("127.0.0.1", fake.port)
        .with_protocol_format(ProtocolFormat::Ascii)
        .with_unit_no(1);
    let mut plc = PanasonicSocketPlc::new(setting);
    plc.connect().unwrap();
    plc
}

#[test]
fn test_data_register_round_trip() {
    let fake = FakePlc::panasonic(Behavior::Serve);
    let plc = connect(&fake);

    plc.write(&SendingPacket::write(Device::D, 100, vec![1234i16, -1]))
        .unwrap();
    assert_eq!(fake.word(100), 1234);
    assert_eq!(fake.word(101), 0xFFFF);

    let reply = plc.read(&SendingPacket::read(Device::D, 100, 2)).unwrap();
    assert_eq!(reply.to_i16s(), vec![1234, -1]);
}

#[test]
fn test_batch_writes_contacts_then_words() {
    let fake = FakePlc::panasonic(Behavior::Serve);
    let plc = connect(&fake);

    plc.write_batch(&[
        SendingPacket::write(Device::D, 5, 77u16),
        SendingPacket::contact_write(Device::R, "12", true).unwrap(),
    ])
    .unwrap();
    assert_eq!(fake.requests(), 2);
    assert_eq!(fake.word(5), 77);
}

#[test]
fn test_unit_mismatch_is_framing_error() {
    let fake = FakePlc::panasonic(Behavior::WrongHeader);
    let plc = connect(&fake);

    let err = plc.read(&SendingPacket::read(Device::D, 0, 1)).unwrap_err();
    assert!(matches!(err, PlcError::Framing { .. }), "{err:?}");
}

#[test]
fn test_plc_error_code() {
    let fake = FakePlc::panasonic(Behavior::Serve);
    let plc = connect(&fake);

    // the fake only knows D registers
    let err = plc
        .read(&SendingPacket::read(Device::F, 0, 1))
        .unwrap_err();
    match err {
        PlcError::NegativeAcknowledgement { code } => assert_eq!(code, "42"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_read_only_contact_rejected_without_io() {
    let fake = FakePlc::panasonic(Behavior::Serve);
    let plc = connect(&fake);

    let err = plc
        .write(&SendingPacket::contact_write(Device::X, "0", true).unwrap())
        .unwrap_err();
    assert!(matches!(err, PlcError::InvalidAddressing { .. }));
    assert_eq!(fake.requests(), 0);
}
