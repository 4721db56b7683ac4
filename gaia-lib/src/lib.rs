//! Host-side codec for the GAIA v3/v4 command protocol.
//!
//! Two transports are supported: a byte stream (RFCOMM) that needs the
//! [`frame`] envelope, and a packet transport (GATT) that carries bare
//! [`packet::Pdu`]s. Everything here is pure encode/decode; opening links,
//! writing bytes and splitting a stream into frames belong to the caller.

pub mod constants;
pub mod error;
pub mod frame;
pub mod message;
pub mod packet;
pub mod segmenter;
pub mod upgrade;


pub use error::GaiaError;
pub use frame::{DecodedFrame, FrameConfig, decode_frame, decode_frame_bytes, encode_frame, encode_pdu};
pub use message::{Command, Response, handle_application_version, parse_application_version, parse_data_bytes_request};
pub use packet::{CommandDescription, PacketType, Pdu, VendorId};
pub use segmenter::{FirmwareSegmenter, SegmentOutput};
pub use upgrade::{DataBytesRequest, UpgradeMessage, UpgradeOpcode};

/// Render bytes as upper-case hex pairs separated by spaces, e.g. `FF 03 00`.
pub fn hex_spaced(bytes: &[u8]) -> String {
    let encoded = hex::encode_upper(bytes);
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(pair[0] as char);
        out.push(pair[1] as char);
    }
    out
}

/// Parse hex input, ignoring spaces, colons and an optional `0x`/`0X` prefix.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, GaiaError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let clean: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    Ok(hex::decode(clean)?)
}
