//! Firmware segmentation for the upgrade data exchange.
//!
//! The device drives the transfer with UPGRADE_DATA_BYTES_REQ notifications.
//! For each request the host answers with one or more UPGRADE_DATA frames,
//! written back to back. The send cursor belongs to the caller; the
//! segmenter only computes its next value.

use crate::constants::*;
use crate::error::GaiaError;
use crate::frame::{FrameConfig, put_frame};
use crate::packet::{PacketType, Pdu};
use crate::upgrade::{DataBytesRequest, data_message};
use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

/// Result of answering one data request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentOutput {
    /// Concatenated frames, to be written to the transport in one go
    pub bytes: Bytes,
    /// Cursor to pass to the next call
    pub next_cursor: usize,
    /// Number of frames in `bytes`
    pub frames: usize,
    /// Firmware bytes carried by those frames
    pub sent: usize,
}

/// Slices an immutable firmware image into UPGRADE_DATA frames.
#[derive(Debug, Clone)]
pub struct FirmwareSegmenter<'a> {
    vendor_id: u16,
    firmware: &'a [u8],
    max_data_bytes: usize,
    config: FrameConfig,
}

impl<'a> FirmwareSegmenter<'a> {
    /// Validate the framing and chunk size once, so that answering requests
    /// never fails.
    ///
    /// Below version 4 the chunk size is capped at 250 bytes so that every
    /// frame fits the 1-byte length field. From version 4 on, a chunk size
    /// that cannot fit even an extended frame is rejected.
    pub fn new(
        vendor_id: u16,
        firmware: &'a [u8],
        max_data_bytes: usize,
        config: FrameConfig,
    ) -> Result<Self, GaiaError> {
        config.validate()?;

        let limit = if config.supports_length_extension() {
            MAX_DATA_BYTES_V4
        } else {
            MAX_DATA_BYTES_V3
        };
        if max_data_bytes == 0 || (config.supports_length_extension() && max_data_bytes > limit) {
            return Err(GaiaError::InvalidChunkSize {
                size: max_data_bytes,
                max: limit,
            });
        }

        Ok(Self {
            vendor_id,
            firmware,
            max_data_bytes: max_data_bytes.min(limit),
            config,
        })
    }

    pub fn firmware_len(&self) -> usize {
        self.firmware.len()
    }

    /// Effective firmware bytes per frame after the version cap
    pub fn max_data_bytes(&self) -> usize {
        self.max_data_bytes
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn respond_to(&self, cursor: usize, request: &DataBytesRequest) -> SegmentOutput {
        self.respond(cursor, request.requested, request.move_by)
    }

    /// Answer one data request.
    ///
    /// `requested` and `move_by` come from the device and are untrusted: the
    /// cursor is clamped to the image, a `move_by` that would reach the end of
    /// the image is ignored, and no more than the remaining bytes are sent.
    /// At least one frame is always produced; with nothing to send it carries
    /// only the end marker.
    pub fn respond(&self, cursor: usize, requested: u32, move_by: u32) -> SegmentOutput {
        let len = self.firmware.len();
        let mut cursor = cursor.min(len);

        if move_by > 0 {
            let moved = cursor.saturating_add(move_by as usize);
            if moved < len {
                cursor = moved;
            } else {
                trace!(cursor, move_by, len, "Ignoring move_by past end of firmware");
            }
        }

        let sent = usize::try_from(requested).unwrap_or(usize::MAX).min(len - cursor);
        let per_frame = self.config.frame_len(0) + 1 + UPGRADE_HEADER_SIZE + 1;
        let mut buf = BytesMut::with_capacity(sent + (sent / self.max_data_bytes + 1) * per_frame);

        let mut remaining = sent;
        let mut frames = 0;
        while remaining > 0 {
            let chunk_len = remaining.min(self.max_data_bytes);
            let is_last = cursor + chunk_len == len;
            self.put_data_frame(&mut buf, is_last, &self.firmware[cursor..cursor + chunk_len]);
            trace!(offset = cursor, chunk_len, is_last, "Queued UPGRADE_DATA");

            cursor += chunk_len;
            remaining -= chunk_len;
            frames += 1;
        }

        if frames == 0 {
            self.put_data_frame(&mut buf, cursor == len, &[]);
            frames = 1;
        }

        debug!(
            requested,
            move_by,
            sent,
            frames,
            next_cursor = cursor,
            len,
            "Answered data request"
        );

        SegmentOutput {
            bytes: buf.freeze(),
            next_cursor: cursor,
            frames,
            sent,
        }
    }

    fn put_data_frame(&self, buf: &mut BytesMut, is_last: bool, chunk: &[u8]) {
        let pdu = Pdu::new(
            self.vendor_id,
            UPGRADE_FEATURE_ID,
            PacketType::Command,
            UPGRADE_CONTROL_COMMAND_ID,
            data_message(is_last, chunk),
        );
        put_frame(buf, &pdu, &self.config);
    }
}
