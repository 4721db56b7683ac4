use crate::constants::*;
use crate::error::GaiaError;
use crate::frame::{FrameConfig, decode_frame, encode_frame};
use crate::packet::{PacketType, Pdu};
use crate::upgrade::{DataBytesRequest, UpgradeMessage, UpgradeOpcode};
use bytes::Bytes;
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Host → device commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Framework: read the application (firmware) version string
    GetApplicationVersion,
    /// Upgrade control carrying an Upgrade Message
    UpgradeControl(UpgradeMessage),
    /// Enable or disable the RWCP data endpoint
    SetRwcpEndpointMode(bool),
    /// Any other command, described field by field
    Raw {
        feature_id: u8,
        packet_type: PacketType,
        command_id: u8,
        payload: Bytes,
    },
}

impl Command {
    pub fn upgrade_control(opcode: impl Into<UpgradeOpcode>, content: impl Into<Bytes>) -> Self {
        Command::UpgradeControl(UpgradeMessage::new(opcode, content))
    }

    /// Build the addressed command for `vendor_id`
    pub fn to_pdu(&self, vendor_id: u16) -> Result<Pdu, GaiaError> {
        let pdu = match self {
            Command::GetApplicationVersion => Pdu::new(
                vendor_id,
                FRAMEWORK_FEATURE_ID,
                PacketType::Command,
                GET_APPLICATION_VERSION_COMMAND_ID,
                Bytes::new(),
            ),
            Command::UpgradeControl(message) => Pdu::new(
                vendor_id,
                UPGRADE_FEATURE_ID,
                PacketType::Command,
                UPGRADE_CONTROL_COMMAND_ID,
                message.encode()?,
            ),
            Command::SetRwcpEndpointMode(enabled) => Pdu::new(
                vendor_id,
                UPGRADE_FEATURE_ID,
                PacketType::Command,
                RWCP_ENDPOINT_MODE_COMMAND_ID,
                Bytes::copy_from_slice(&[u8::from(*enabled)]),
            ),
            Command::Raw {
                feature_id,
                packet_type,
                command_id,
                payload,
            } => Pdu::new(vendor_id, *feature_id, *packet_type, *command_id, payload.clone()),
        };
        Ok(pdu)
    }

    /// Framed bytes for the byte-stream transport
    pub fn encode_frame(&self, vendor_id: u16, config: &FrameConfig) -> Result<Bytes, GaiaError> {
        encode_frame(&self.to_pdu(vendor_id)?, config)
    }

    /// Unframed PDU bytes for the packet transport
    pub fn encode_pdu(&self, vendor_id: u16) -> Result<Bytes, GaiaError> {
        Ok(self.to_pdu(vendor_id)?.to_bytes())
    }
}

/// Device → host messages this codec understands
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Response {
    /// Response to `GetApplicationVersion`. May be empty.
    ApplicationVersion(String),
    /// Upgrade notification asking for more firmware bytes
    DataBytesRequest(DataBytesRequest),
}

impl Response {
    /// Try every recognizer against one complete frame.
    pub fn recognize(frame: &[u8], expected_vendor_id: u16) -> Option<Self> {
        let decoded = decode_frame(frame, expected_vendor_id)?;
        Self::from_pdu(&decoded.pdu)
    }

    /// Try every recognizer against a PDU received on the packet transport.
    pub fn recognize_pdu(pdu: &Pdu, expected_vendor_id: u16) -> Option<Self> {
        if pdu.vendor_id != expected_vendor_id {
            trace!(vendor_id = pdu.vendor_id, "PDU from another vendor");
            return None;
        }
        Self::from_pdu(pdu)
    }

    fn from_pdu(pdu: &Pdu) -> Option<Self> {
        application_version(pdu)
            .map(Response::ApplicationVersion)
            .or_else(|| data_bytes_request(pdu).map(Response::DataBytesRequest))
    }
}

fn application_version(pdu: &Pdu) -> Option<String> {
    if !pdu
        .command
        .matches(FRAMEWORK_FEATURE_ID, PacketType::Response, GET_APPLICATION_VERSION_COMMAND_ID)
    {
        return None;
    }
    Some(String::from_utf8_lossy(&pdu.payload).into_owned())
}

fn data_bytes_request(pdu: &Pdu) -> Option<DataBytesRequest> {
    if !pdu
        .command
        .matches(UPGRADE_FEATURE_ID, PacketType::Notification, UPGRADE_NOTIFICATION_COMMAND_ID)
    {
        return None;
    }
    let message = UpgradeMessage::decode(&pdu.payload)?;
    let request = message.as_data_bytes_request();
    if request.is_none() {
        trace!(opcode = ?message.opcode, len = message.content.len(), "Upgrade notification is not a data request");
    }
    request
}

/// Extract the version string from a "get application version" response frame.
///
/// Anything else, including the same command with another packet type,
/// yields `None`.
pub fn parse_application_version(frame: &[u8], expected_vendor_id: u16) -> Option<String> {
    let decoded = decode_frame(frame, expected_vendor_id)?;
    application_version(&decoded.pdu)
}

pub fn parse_application_version_pdu(pdu: &Pdu, expected_vendor_id: u16) -> Option<String> {
    if pdu.vendor_id != expected_vendor_id {
        return None;
    }
    application_version(pdu)
}

/// Extract `requested`/`move_by` from an UPGRADE_DATA_BYTES_REQ notification frame.
pub fn parse_data_bytes_request(frame: &[u8], expected_vendor_id: u16) -> Option<DataBytesRequest> {
    let decoded = decode_frame(frame, expected_vendor_id)?;
    data_bytes_request(&decoded.pdu)
}

pub fn parse_data_bytes_request_pdu(pdu: &Pdu, expected_vendor_id: u16) -> Option<DataBytesRequest> {
    if pdu.vendor_id != expected_vendor_id {
        return None;
    }
    data_bytes_request(pdu)
}

/// Call `on_version` with the version string if `frame` is an application
/// version response. Returns whether the callback ran.
pub fn handle_application_version<F>(frame: &[u8], expected_vendor_id: u16, on_version: F) -> bool
where
    F: FnOnce(&str),
{
    match parse_application_version(frame, expected_vendor_id) {
        Some(version) => {
            on_version(&version);
            true
        }
        None => false,
    }
}
