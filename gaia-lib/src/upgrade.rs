//! Upgrade Message sub-format carried inside upgrade-feature payloads:
//! `opcode(1) + content_length(2, BE) + content`.
//!
//! Decoding is strict about short input and tolerant about long input: a
//! declared length larger than what follows the header is rejected, bytes
//! beyond the declared length are dropped.

use crate::constants::{DATA_BYTES_REQ_SIZE, DATA_LAST, DATA_NOT_LAST, MAX_UPGRADE_CONTENT, UPGRADE_HEADER_SIZE};
use crate::error::GaiaError;
use bytes::{BufMut, Bytes, BytesMut};
use num_enum::{FromPrimitive, IntoPrimitive};
use tracing::trace;
use zerocopy::byteorder::big_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum UpgradeOpcode {
    /// UPGRADE_DATA_BYTES_REQ (device → host)
    DataBytesRequest = 0x03,
    /// UPGRADE_DATA (host → device)
    Data = 0x04,

    #[num_enum(catch_all)]
    Other(u8),
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct UpgradeHeaderRaw {
    opcode: u8,
    length: U16,
}

#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct DataBytesRequestRaw {
    requested: U32,
    move_by: U32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeMessage {
    pub opcode: UpgradeOpcode,
    pub content: Bytes,
}

impl UpgradeMessage {
    pub fn new(opcode: impl Into<UpgradeOpcode>, content: impl Into<Bytes>) -> Self {
        Self {
            opcode: opcode.into(),
            content: content.into(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        UPGRADE_HEADER_SIZE + self.content.len()
    }

    pub fn encode(&self) -> Result<Bytes, GaiaError> {
        if self.content.len() > MAX_UPGRADE_CONTENT {
            return Err(GaiaError::ContentTooLarge { len: self.content.len() });
        }
        let header = UpgradeHeaderRaw {
            opcode: self.opcode.into(),
            length: U16::new(self.content.len() as u16),
        };
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(header.as_bytes());
        buf.put_slice(&self.content);
        Ok(buf.freeze())
    }

    /// Parse one Upgrade Message, keeping exactly the declared content length.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let Ok((header, rest)) = UpgradeHeaderRaw::ref_from_prefix(bytes) else {
            trace!(len = bytes.len(), "Upgrade Message shorter than its header");
            return None;
        };
        let declared = usize::from(header.length.get());
        let Some(content) = rest.get(..declared) else {
            trace!(declared, available = rest.len(), "Upgrade Message content truncated");
            return None;
        };
        Some(Self {
            opcode: UpgradeOpcode::from_primitive(header.opcode),
            content: Bytes::copy_from_slice(content),
        })
    }

    /// The request parameters, if this is a well-formed UPGRADE_DATA_BYTES_REQ.
    pub fn as_data_bytes_request(&self) -> Option<DataBytesRequest> {
        if self.opcode != UpgradeOpcode::DataBytesRequest {
            return None;
        }
        DataBytesRequest::from_content(&self.content)
    }
}

/// Encode an UPGRADE_DATA message: end marker byte followed by firmware bytes.
///
/// `chunk` must not exceed `MAX_UPGRADE_CONTENT - 1` bytes; the segmenter
/// guarantees this through its chunk-size validation.
pub(crate) fn data_message(is_last: bool, chunk: &[u8]) -> Bytes {
    let content_len = 1 + chunk.len();
    let header = UpgradeHeaderRaw {
        opcode: UpgradeOpcode::Data.into(),
        length: U16::new(content_len as u16),
    };
    let mut buf = BytesMut::with_capacity(UPGRADE_HEADER_SIZE + content_len);
    buf.put_slice(header.as_bytes());
    buf.put_u8(if is_last { DATA_LAST } else { DATA_NOT_LAST });
    buf.put_slice(chunk);
    buf.freeze()
}

/// Parameters of an UPGRADE_DATA_BYTES_REQ.
///
/// `move_by` advances the host's send cursor past bytes the device already
/// holds; it never moves the cursor backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataBytesRequest {
    pub requested: u32,
    pub move_by: u32,
}

impl DataBytesRequest {
    /// Read the two big-endian u32 values. The content must be exactly 8 bytes.
    pub fn from_content(content: &[u8]) -> Option<Self> {
        let raw = DataBytesRequestRaw::ref_from_bytes(content).ok()?;
        Some(Self {
            requested: raw.requested.get(),
            move_by: raw.move_by.get(),
        })
    }

    pub fn to_message(&self) -> UpgradeMessage {
        let raw = DataBytesRequestRaw {
            requested: U32::new(self.requested),
            move_by: U32::new(self.move_by),
        };
        debug_assert_eq!(raw.as_bytes().len(), DATA_BYTES_REQ_SIZE);
        UpgradeMessage::new(UpgradeOpcode::DataBytesRequest, Bytes::copy_from_slice(raw.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let msg = UpgradeMessage::new(0x04u8, Bytes::from_static(&[0x01, 0xAA, 0xBB]));
        assert_eq!(msg.encode().unwrap().as_ref(), &[0x04, 0x00, 0x03, 0x01, 0xAA, 0xBB]);
    }

    #[test]
    fn test_data_message_matches_generic_encoding() {
        let generic = UpgradeMessage::new(UpgradeOpcode::Data, Bytes::from_static(&[0x00, 0x10, 0x20]))
            .encode()
            .unwrap();
        assert_eq!(data_message(false, &[0x10, 0x20]), generic);

        let last = data_message(true, &[]);
        assert_eq!(last.as_ref(), &[0x04, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn test_data_bytes_request_requires_exact_size() {
        assert!(DataBytesRequest::from_content(&[0; 7]).is_none());
        assert!(DataBytesRequest::from_content(&[0; 9]).is_none());
        let req = DataBytesRequest::from_content(&[0, 0, 1, 0, 0, 0, 0, 4]).unwrap();
        assert_eq!(req.requested, 256);
        assert_eq!(req.move_by, 4);
    }
}
