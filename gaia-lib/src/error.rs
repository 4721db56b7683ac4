use thiserror::Error;

/// The primary error type for the `gaia-lib` library.
///
/// Every variant is a caller-contract violation detected before any byte is
/// produced. Inbound frames that fail to match are reported as `None`, not as
/// an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GaiaError {
    #[error("Unsupported protocol version {0}: framing requires version 3 or later")]
    UnsupportedVersion(u8),

    #[error("Payload of {len} bytes exceeds the {max}-byte limit of version {version} framing")]
    PayloadTooLarge { len: usize, max: usize, version: u8 },

    #[error("Upgrade Message content of {len} bytes exceeds the 16-bit length field")]
    ContentTooLarge { len: usize },

    #[error("Invalid firmware chunk size {size}: must be between 1 and {max}")]
    InvalidChunkSize { size: usize, max: usize },

    #[error("PDU too short: expected at least 4 bytes, got {actual}")]
    PduTooShort { actual: usize },

    #[error("Invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
