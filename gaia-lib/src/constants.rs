// Protocol constants for GAIA v3/v4

/// Start-of-frame marker for the byte-stream (RFCOMM) transport
pub const SOF: u8 = 0xFF;

/// Flags bit 0: a trailing XOR checksum byte is present
pub const FLAG_CHECKSUM: u8 = 0x01;

/// Flags bit 1: the length field is 2 bytes (version 4 and later only)
pub const FLAG_LENGTH_EXTENSION: u8 = 0x02;

/// Lowest framing version this codec speaks
pub const MIN_PROTOCOL_VERSION: u8 = 3;

/// First framing version that understands the length extension
pub const LENGTH_EXTENSION_VERSION: u8 = 4;

/// Size of the addressed-command header: vendor id (2) + command description (2)
pub const PDU_HEADER_SIZE: usize = 4;

/// Smallest frame that can carry a PDU header (SOF, version, flags, 1-byte length, PDU header)
pub const MIN_FRAME_SIZE: usize = 8;

/// Largest payload a version 3 frame accepts
pub const MAX_PAYLOAD_V3: usize = 0xFE;

/// Largest payload a version 4 frame accepts
pub const MAX_PAYLOAD_V4: usize = 0xFFFF;

/// Payloads longer than this need the 2-byte length field
pub const SHORT_LENGTH_MAX: usize = 0xFF;

/// Size of the Upgrade Message header: opcode (1) + content length (2)
pub const UPGRADE_HEADER_SIZE: usize = 3;

/// Largest Upgrade Message content
pub const MAX_UPGRADE_CONTENT: usize = 0xFFFF;

/// Default firmware bytes per UPGRADE_DATA packet
pub const DEFAULT_MAX_DATA_BYTES: usize = 250;

/// Firmware bytes per UPGRADE_DATA packet that still fit a version 3 frame:
/// opcode (1) + length (2) + end marker (1) + data must stay within 0xFE
pub const MAX_DATA_BYTES_V3: usize = MAX_PAYLOAD_V3 - UPGRADE_HEADER_SIZE - 1;

/// Firmware bytes per UPGRADE_DATA packet that still fit a version 4 frame
pub const MAX_DATA_BYTES_V4: usize = MAX_PAYLOAD_V4 - UPGRADE_HEADER_SIZE - 1;

// --- Vendor ids ---

/// QTIL vendor id used by the v3 feature set (default)
pub const VENDOR_ID_QTIL: u16 = 0x001D;

/// Vendor id of the legacy v1/v2 command set
pub const VENDOR_ID_LEGACY: u16 = 0x000A;

// --- Features and commands ---

/// Framework feature
pub const FRAMEWORK_FEATURE_ID: u8 = 0x00;

/// Framework: get application (firmware) version
pub const GET_APPLICATION_VERSION_COMMAND_ID: u8 = 0x05;

/// Upgrade feature
pub const UPGRADE_FEATURE_ID: u8 = 0x06;

/// Upgrade: notification carrying an Upgrade Message from the device
pub const UPGRADE_NOTIFICATION_COMMAND_ID: u8 = 0x00;

/// Upgrade: control command carrying an Upgrade Message to the device
pub const UPGRADE_CONTROL_COMMAND_ID: u8 = 0x02;

/// Upgrade: switch the RWCP data endpoint on or off
pub const RWCP_ENDPOINT_MODE_COMMAND_ID: u8 = 0x04;

// --- Upgrade opcodes ---

/// UPGRADE_DATA_BYTES_REQ: device asks for more firmware bytes
pub const UPGRADE_DATA_BYTES_REQ: u8 = 0x03;

/// UPGRADE_DATA: host sends firmware bytes
pub const UPGRADE_DATA: u8 = 0x04;

/// Content length of UPGRADE_DATA_BYTES_REQ: requested (u32) + move-by (u32)
pub const DATA_BYTES_REQ_SIZE: usize = 8;

/// End marker byte for a non-final UPGRADE_DATA chunk
pub const DATA_NOT_LAST: u8 = 0x00;

/// End marker byte for the final UPGRADE_DATA chunk
pub const DATA_LAST: u8 = 0x01;
