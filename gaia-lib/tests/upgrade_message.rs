//! Tests for the Upgrade Message sub-format

mod common;

use common::*;

#[test]
fn test_encode_empty_content() {
    let msg = UpgradeMessage::new(UpgradeOpcode::Other(0x07), Bytes::new());
    assert_eq!(msg.encode().unwrap().as_ref(), &[0x07, 0x00, 0x00]);
}

#[test]
fn test_encode_length_is_big_endian() {
    let content = vec![0xAB; 0x0102];
    let encoded = UpgradeMessage::new(UpgradeOpcode::Data, content).encode().unwrap();
    assert_eq!(&encoded[..3], &[0x04, 0x01, 0x02]);
    assert_eq!(encoded.len(), 3 + 0x0102);
}

#[test]
fn test_encode_rejects_oversized_content() {
    let msg = UpgradeMessage::new(UpgradeOpcode::Data, vec![0u8; 0x10000]);
    assert_eq!(msg.encode().unwrap_err(), GaiaError::ContentTooLarge { len: 0x10000 });

    let max = UpgradeMessage::new(UpgradeOpcode::Data, vec![0u8; 0xFFFF]);
    assert_eq!(max.encode().unwrap().len(), 3 + 0xFFFF);
}

#[test]
fn test_decode_requires_header() {
    assert!(UpgradeMessage::decode(&[]).is_none());
    assert!(UpgradeMessage::decode(&[0x03]).is_none());
    assert!(UpgradeMessage::decode(&[0x03, 0x00]).is_none());

    let empty = UpgradeMessage::decode(&[0x03, 0x00, 0x00]).expect("header-only message is valid");
    assert_eq!(empty.opcode, UpgradeOpcode::DataBytesRequest);
    assert!(empty.content.is_empty());
}

#[test]
fn test_decode_rejects_short_content() {
    // Declares 4 content bytes, only 3 follow
    assert!(UpgradeMessage::decode(&[0x04, 0x00, 0x04, 0x01, 0x02, 0x03]).is_none());
}

#[test]
fn test_decode_drops_excess_bytes() {
    // Declares 2 content bytes, 4 follow
    let msg = UpgradeMessage::decode(&[0x04, 0x00, 0x02, 0x01, 0x02, 0x03, 0x04]).expect("long input is tolerated");
    assert_eq!(msg.opcode, UpgradeOpcode::Data);
    assert_eq!(msg.content.as_ref(), &[0x01, 0x02]);
}

#[test]
fn test_unknown_opcodes_are_kept() {
    let msg = UpgradeMessage::decode(&[0x15, 0x00, 0x01, 0xEE]).unwrap();
    assert_eq!(msg.opcode, UpgradeOpcode::Other(0x15));
    assert_eq!(u8::from(msg.opcode), 0x15);
}

#[test]
fn test_data_bytes_request_message() {
    let msg = DataBytesRequest {
        requested: 0x0102_0304,
        move_by: 0x0A0B_0C0D,
    }
    .to_message();
    assert_eq!(msg.opcode, UpgradeOpcode::DataBytesRequest);
    assert_eq!(
        msg.content.as_ref(),
        &[0x01, 0x02, 0x03, 0x04, 0x0A, 0x0B, 0x0C, 0x0D]
    );

    let parsed = msg.as_data_bytes_request().expect("content is exactly 8 bytes");
    assert_eq!(parsed.requested, 0x0102_0304);
    assert_eq!(parsed.move_by, 0x0A0B_0C0D);
}

#[test]
fn test_as_data_bytes_request_checks_opcode() {
    let msg = UpgradeMessage::new(UpgradeOpcode::Data, vec![0u8; 8]);
    assert!(msg.as_data_bytes_request().is_none());
}
