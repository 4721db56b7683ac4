//! Common test utilities and shared imports

// Shared across test files; not every item is used in every file
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use gaia_lib::constants::*;
#[allow(unused_imports)]
pub use gaia_lib::frame::{
    DecodedFrame, FrameConfig, decode_frame, decode_frame_bytes, encode_frame, encode_pdu, xor_checksum,
};
#[allow(unused_imports)]
pub use gaia_lib::message::{
    Command, Response, handle_application_version, parse_application_version, parse_application_version_pdu,
    parse_data_bytes_request, parse_data_bytes_request_pdu,
};
#[allow(unused_imports)]
pub use gaia_lib::packet::{CommandDescription, PacketType, Pdu};
#[allow(unused_imports)]
pub use gaia_lib::segmenter::{FirmwareSegmenter, SegmentOutput};
#[allow(unused_imports)]
pub use gaia_lib::upgrade::{DataBytesRequest, UpgradeMessage, UpgradeOpcode};
#[allow(unused_imports)]
pub use gaia_lib::{GaiaError, hex_spaced};

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}

/// Route library logs to the test harness; `RUST_LOG=trace` shows why a frame was rejected
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Get Application Version response carrying "1.2.3" (v3, no checksum)
#[allow(dead_code)]
pub const VERSION_RESPONSE_FRAME: &str = "ff030005001d0105312e322e33";

/// UPGRADE_DATA_BYTES_REQ notification: requested = 0x100, move_by = 0 (v3, no checksum)
#[allow(dead_code)]
pub const DATA_BYTES_REQ_FRAME: &str = "ff03000b001d0c800300080000010000000000";

/// Build an upgrade notification frame around an arbitrary Upgrade Message payload
#[allow(dead_code)]
pub fn upgrade_notification_frame(payload: &[u8], config: &FrameConfig) -> Bytes {
    let pdu = Pdu::new(
        VENDOR_ID_QTIL,
        UPGRADE_FEATURE_ID,
        PacketType::Notification,
        UPGRADE_NOTIFICATION_COMMAND_ID,
        Bytes::copy_from_slice(payload),
    );
    encode_frame(&pdu, config).expect("Failed to encode notification")
}

/// Split concatenated frames produced by the segmenter. Frames are assumed
/// well-formed; this is a test helper, not a stream deframer.
#[allow(dead_code)]
pub fn split_frames(mut bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut frames = Vec::new();
    while !bytes.is_empty() {
        let version = bytes[1];
        let flags = bytes[2];
        let extended = version >= 4 && flags & FLAG_LENGTH_EXTENSION != 0;
        let (header_len, payload_len) = if extended {
            (5, u16::from_be_bytes([bytes[3], bytes[4]]) as usize)
        } else {
            (4, bytes[3] as usize)
        };
        let total = header_len + PDU_HEADER_SIZE + payload_len + usize::from(flags & FLAG_CHECKSUM != 0);
        frames.push(bytes[..total].to_vec());
        bytes = &bytes[total..];
    }
    frames
}

/// Upgrade Message content (end marker + data) of one UPGRADE_DATA frame
#[allow(dead_code)]
pub fn data_content(frame: &[u8]) -> Vec<u8> {
    let decoded = decode_frame(frame, VENDOR_ID_QTIL).expect("UPGRADE_DATA frame should decode");
    assert_eq!(
        decoded.command().unpack(),
        (UPGRADE_FEATURE_ID, PacketType::Command, UPGRADE_CONTROL_COMMAND_ID)
    );
    let message = UpgradeMessage::decode(decoded.payload()).expect("payload should be an Upgrade Message");
    assert_eq!(message.opcode, UpgradeOpcode::Data);
    message.content.to_vec()
}
