//! Byte-stream framing for GAIA v3/v4.
//!
//! ```text
//! +------+---------+-------+------------+-----------+---------+---------+-----------+
//! | 0xFF | version | flags | len (1|2)  | vendor(2) | cmd(2)  | payload | [xor(1)]  |
//! +------+---------+-------+------------+-----------+---------+---------+-----------+
//! ```
//!
//! - `flags.bit0`: trailing XOR checksum over every preceding byte of the frame
//! - `flags.bit1`: 2-byte big-endian length field (version 4 and later)
//! - `len` counts the payload only, never the 4-byte vendor/command header
//!
//! The decoder takes exactly one complete frame. Splitting a continuous stream
//! into frames is the transport's job.

use crate::constants::*;
use crate::error::GaiaError;
use crate::packet::{CommandDescription, Pdu};
use bytes::{BufMut, Bytes, BytesMut};
use std::ops::Range;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Framing options for outbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameConfig {
    pub protocol_version: u8,
    pub use_checksum: bool,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self::v3()
    }
}

impl FrameConfig {
    /// Version 3 framing: 1-byte length, payload up to 0xFE bytes
    pub const fn v3() -> Self {
        Self {
            protocol_version: 3,
            use_checksum: false,
        }
    }

    /// Version 4 framing: length extension for payloads over 0xFF bytes
    pub const fn v4() -> Self {
        Self {
            protocol_version: LENGTH_EXTENSION_VERSION,
            use_checksum: false,
        }
    }

    pub const fn with_checksum(mut self, use_checksum: bool) -> Self {
        self.use_checksum = use_checksum;
        self
    }

    pub fn validate(&self) -> Result<(), GaiaError> {
        if self.protocol_version < MIN_PROTOCOL_VERSION {
            return Err(GaiaError::UnsupportedVersion(self.protocol_version));
        }
        Ok(())
    }

    pub fn supports_length_extension(&self) -> bool {
        self.protocol_version >= LENGTH_EXTENSION_VERSION
    }

    /// Largest payload one frame can carry under this configuration
    pub fn max_payload_len(&self) -> usize {
        if self.supports_length_extension() {
            MAX_PAYLOAD_V4
        } else {
            MAX_PAYLOAD_V3
        }
    }

    /// Whether a payload of `payload_len` bytes needs the 2-byte length field
    pub fn uses_length_extension(&self, payload_len: usize) -> bool {
        self.supports_length_extension() && payload_len > SHORT_LENGTH_MAX
    }

    /// Total frame size for a payload of `payload_len` bytes
    pub fn frame_len(&self, payload_len: usize) -> usize {
        let length_field = if self.uses_length_extension(payload_len) { 2 } else { 1 };
        3 + length_field + PDU_HEADER_SIZE + payload_len + usize::from(self.use_checksum)
    }

    fn check_payload(&self, payload_len: usize) -> Result<(), GaiaError> {
        self.validate()?;
        let max = self.max_payload_len();
        if payload_len > max {
            return Err(GaiaError::PayloadTooLarge {
                len: payload_len,
                max,
                version: self.protocol_version,
            });
        }
        Ok(())
    }
}

/// XOR of every byte in `bytes`
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Wrap a PDU in a frame.
///
/// Fails without producing bytes when the version is below 3 or the payload
/// does not fit the version's length field. Larger transfers must be chunked
/// by the caller (see [`crate::segmenter::FirmwareSegmenter`]).
pub fn encode_frame(pdu: &Pdu, config: &FrameConfig) -> Result<Bytes, GaiaError> {
    config.check_payload(pdu.payload.len())?;

    let mut buf = BytesMut::with_capacity(config.frame_len(pdu.payload.len()));
    put_frame(&mut buf, pdu, config);

    debug!(
        vendor_id = format_args!("{:#06x}", pdu.vendor_id),
        command = format_args!("{:#06x}", pdu.command.value()),
        payload_len = pdu.payload.len(),
        version = config.protocol_version,
        checksum = config.use_checksum,
        "Encoded frame"
    );
    Ok(buf.freeze())
}

/// PDU bytes without framing, for transports that frame packets themselves.
pub fn encode_pdu(pdu: &Pdu) -> Bytes {
    pdu.to_bytes()
}

/// Append one frame to `buf`. The payload length must already be checked
/// against `config`.
pub(crate) fn put_frame(buf: &mut BytesMut, pdu: &Pdu, config: &FrameConfig) {
    let payload_len = pdu.payload.len();
    let extended = config.uses_length_extension(payload_len);

    let mut flags = 0u8;
    if config.use_checksum {
        flags |= FLAG_CHECKSUM;
    }
    if extended {
        flags |= FLAG_LENGTH_EXTENSION;
    }

    let start = buf.len();
    buf.put_u8(SOF);
    buf.put_u8(config.protocol_version);
    buf.put_u8(flags);
    if extended {
        buf.put_u16(payload_len as u16);
    } else {
        buf.put_u8(payload_len as u8);
    }
    pdu.put_into(buf);

    if config.use_checksum {
        let checksum = xor_checksum(&buf[start..]);
        buf.put_u8(checksum);
    }
}

/// A frame that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub protocol_version: u8,
    pub has_checksum: bool,
    pub pdu: Pdu,
}

impl DecodedFrame {
    pub fn command(&self) -> CommandDescription {
        self.pdu.command
    }

    pub fn payload(&self) -> &Bytes {
        &self.pdu.payload
    }
}

fn reject<T>(reason: &'static str, len: usize) -> Option<T> {
    trace!(reason, len, "Frame not recognized");
    None
}

/// Header fields of a validated frame and the position of its payload
struct FrameLayout {
    protocol_version: u8,
    has_checksum: bool,
    vendor_id: u16,
    command: CommandDescription,
    payload: Range<usize>,
}

impl FrameLayout {
    fn into_decoded(self, payload: Bytes) -> DecodedFrame {
        DecodedFrame {
            protocol_version: self.protocol_version,
            has_checksum: self.has_checksum,
            pdu: Pdu {
                vendor_id: self.vendor_id,
                command: self.command,
                payload,
            },
        }
    }
}

fn validate(frame: &[u8], expected_vendor_id: u16) -> Option<FrameLayout> {
    let len = frame.len();
    if len < MIN_FRAME_SIZE {
        return reject("too short", len);
    }
    if frame[0] != SOF {
        return reject("bad start byte", len);
    }

    let protocol_version = frame[1];
    if protocol_version < MIN_PROTOCOL_VERSION {
        return reject("unsupported version", len);
    }

    let flags = frame[2];
    let has_checksum = flags & FLAG_CHECKSUM != 0;
    let extended = protocol_version >= LENGTH_EXTENSION_VERSION && flags & FLAG_LENGTH_EXTENSION != 0;

    let header_len = if extended { 5 } else { 4 };
    if len < header_len + PDU_HEADER_SIZE {
        return reject("truncated header", len);
    }

    let payload_len = if extended {
        usize::from(u16::from_be_bytes([frame[3], frame[4]]))
    } else {
        usize::from(frame[3])
    };

    let expected_len = header_len + PDU_HEADER_SIZE + payload_len + usize::from(has_checksum);
    if len != expected_len {
        trace!(expected_len, "Length field disagrees with frame size");
        return reject("length mismatch", len);
    }

    if has_checksum && xor_checksum(&frame[..len - 1]) != frame[len - 1] {
        return reject("checksum mismatch", len);
    }

    let vendor_id = u16::from_be_bytes([frame[header_len], frame[header_len + 1]]);
    if vendor_id != expected_vendor_id {
        return reject("vendor mismatch", len);
    }

    let command = CommandDescription::from(u16::from_be_bytes([frame[header_len + 2], frame[header_len + 3]]));
    let payload_start = header_len + PDU_HEADER_SIZE;

    Some(FrameLayout {
        protocol_version,
        has_checksum,
        vendor_id,
        command,
        payload: payload_start..payload_start + payload_len,
    })
}

/// Validate and strip one complete frame.
///
/// Returns `None` for anything that is not exactly one well-formed frame from
/// `expected_vendor_id`: short input, wrong start byte, version below 3,
/// length field disagreeing with the input size (in either direction), bad
/// checksum, or another vendor. The payload is copied out of `frame`; use
/// [`decode_frame_bytes`] to share the buffer instead.
pub fn decode_frame(frame: &[u8], expected_vendor_id: u16) -> Option<DecodedFrame> {
    let layout = validate(frame, expected_vendor_id)?;
    let payload = Bytes::copy_from_slice(&frame[layout.payload.clone()]);
    Some(layout.into_decoded(payload))
}

/// Same checks as [`decode_frame`]; the payload is a slice of `frame`.
pub fn decode_frame_bytes(frame: &Bytes, expected_vendor_id: u16) -> Option<DecodedFrame> {
    let layout = validate(frame, expected_vendor_id)?;
    let payload = frame.slice(layout.payload.clone());
    Some(layout.into_decoded(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketType;

    #[test]
    fn test_version_query_frame_bytes() {
        let pdu = Pdu::new(0x001D, 0x00, PacketType::Command, 0x05, Bytes::new());
        let frame = encode_frame(&pdu, &FrameConfig::v3()).unwrap();
        assert_eq!(frame.as_ref(), &[0xFF, 0x03, 0x00, 0x00, 0x00, 0x1D, 0x00, 0x05]);
    }

    #[test]
    fn test_checksum_is_xor_of_preceding_bytes() {
        let pdu = Pdu::new(0x001D, 0x00, PacketType::Command, 0x05, Bytes::new());
        let frame = encode_frame(&pdu, &FrameConfig::v3().with_checksum(true)).unwrap();
        assert_eq!(frame.len(), 9);
        assert_eq!(frame[2], FLAG_CHECKSUM);
        let expected = 0xFF ^ 0x03 ^ 0x01 ^ 0x00 ^ 0x00 ^ 0x1D ^ 0x00 ^ 0x05;
        assert_eq!(frame[8], expected);
        assert_eq!(xor_checksum(&frame), 0);
    }

    #[test]
    fn test_frame_len_matches_encoding() {
        for config in [FrameConfig::v3(), FrameConfig::v4().with_checksum(true)] {
            for len in [0usize, 1, 200, 254] {
                let pdu = Pdu::new(0x000A, 0x01, PacketType::Command, 0x01, vec![0u8; len]);
                let frame = encode_frame(&pdu, &config).unwrap();
                assert_eq!(frame.len(), config.frame_len(len));
            }
        }
    }

    #[test]
    fn test_decode_rejects_wrong_vendor() {
        let pdu = Pdu::new(0x000A, 0x00, PacketType::Response, 0x05, Bytes::from_static(b"1.0"));
        let frame = encode_frame(&pdu, &FrameConfig::v3()).unwrap();
        assert!(decode_frame(&frame, 0x001D).is_none());
        assert!(decode_frame(&frame, 0x000A).is_some());
    }

    #[test]
    fn test_decode_frame_bytes_shares_payload() {
        let pdu = Pdu::new(0x001D, 0x00, PacketType::Response, 0x05, Bytes::from_static(b"1.2.3"));
        let frame = encode_frame(&pdu, &FrameConfig::v3().with_checksum(true)).unwrap();

        let decoded = decode_frame_bytes(&frame, 0x001D).expect("valid frame should decode");
        assert_eq!(decoded.payload().as_ref(), b"1.2.3");
        assert_eq!(decoded.payload().as_ptr(), frame[8..].as_ptr());
        assert_eq!(Some(decoded), decode_frame(&frame, 0x001D));

        assert!(decode_frame_bytes(&frame, 0x000A).is_none());
        assert!(decode_frame_bytes(&frame.slice(..frame.len() - 1), 0x001D).is_none());
    }
}
