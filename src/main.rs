mod cli;
mod logging;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use clap::Parser;
use gaia_lib::constants::UPGRADE_FEATURE_ID;
use gaia_lib::{
    Command, FirmwareSegmenter, PacketType, Pdu, Response, UpgradeMessage, VendorId, decode_frame_bytes, hex_spaced,
};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use cli::{Cli, CliCommand, FramingArgs, hex_words};

#[derive(Debug, Serialize)]
struct EncodedOutput {
    len: usize,
    hex: String,
}

#[derive(Debug, Serialize)]
struct DecodedOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol_version: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<bool>,
    vendor_id: u16,
    command: u16,
    feature_id: u8,
    packet_type: PacketType,
    command_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    upgrade_opcode: Option<u8>,
    payload: String,
}

impl DecodedOutput {
    fn new(pdu: &Pdu, frame: Option<(u8, bool)>) -> Self {
        let upgrade_opcode = (pdu.feature_id() == UPGRADE_FEATURE_ID)
            .then(|| UpgradeMessage::decode(&pdu.payload))
            .flatten()
            .map(|message| u8::from(message.opcode));
        Self {
            protocol_version: frame.map(|(version, _)| version),
            checksum: frame.map(|(_, checksum)| checksum),
            vendor_id: pdu.vendor_id,
            command: pdu.command.value(),
            feature_id: pdu.feature_id(),
            packet_type: pdu.packet_type(),
            command_id: pdu.command_id(),
            upgrade_opcode,
            payload: hex_spaced(&pdu.payload),
        }
    }
}

#[derive(Debug, Serialize)]
struct SegmentOutputView {
    frames: usize,
    sent: usize,
    next_cursor: usize,
    hex: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::setup_logging(cli.log_file.clone(), &cli.verbose)?;
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let framing = &cli.framing;
    let json = cli.json;

    match cli.command {
        CliCommand::VersionQuery => emit(&encode_command(&Command::GetApplicationVersion, framing)?, json),
        CliCommand::UpgradeControl { opcode, content } => {
            emit(&encode_command(&Command::upgrade_control(opcode, content), framing)?, json)
        }
        CliCommand::Rwcp { disable } => emit(&encode_command(&Command::SetRwcpEndpointMode(!disable), framing)?, json),
        CliCommand::Raw {
            feature,
            packet_type,
            command_id,
            payload,
        } => {
            let command = Command::Raw {
                feature_id: feature,
                packet_type: packet_type.into(),
                command_id,
                payload,
            };
            emit(&encode_command(&command, framing)?, json)
        }
        CliCommand::Parse { hex } => {
            let input = hex_words(&hex)?;
            let response = recognize(&input, framing)?
                .with_context(|| format!("Not a recognized message: {}", hex_spaced(&input)))?;
            print_response(&response, json)
        }
        CliCommand::Decode { hex } => {
            let input = Bytes::from(hex_words(&hex)?);
            print_decoded(&decode(input, framing)?, json)
        }
        CliCommand::Segment {
            firmware,
            cursor,
            requested,
            move_by,
            max_data_bytes,
        } => segment(&firmware, cursor, requested, move_by, max_data_bytes, framing, json),
    }
}

fn encode_command(command: &Command, framing: &FramingArgs) -> Result<Bytes> {
    let bytes = if framing.pdu {
        command.encode_pdu(framing.vendor)?
    } else {
        command.encode_frame(framing.vendor, &framing.frame_config())?
    };
    debug!(len = bytes.len(), pdu = framing.pdu, "Encoded command");
    Ok(bytes)
}

fn recognize(input: &[u8], framing: &FramingArgs) -> Result<Option<Response>> {
    if framing.pdu {
        let pdu = Pdu::try_from(Bytes::copy_from_slice(input))?;
        Ok(Response::recognize_pdu(&pdu, framing.vendor))
    } else {
        Ok(Response::recognize(input, framing.vendor))
    }
}

fn decode(input: Bytes, framing: &FramingArgs) -> Result<DecodedOutput> {
    if framing.pdu {
        let pdu = Pdu::try_from(input)?;
        return Ok(DecodedOutput::new(&pdu, None));
    }
    let decoded = decode_frame_bytes(&input, framing.vendor)
        .with_context(|| format!("Not a valid frame from vendor {:#06x}", framing.vendor))?;
    Ok(DecodedOutput::new(
        &decoded.pdu,
        Some((decoded.protocol_version, decoded.has_checksum)),
    ))
}

fn segment(
    firmware: &Path,
    cursor: usize,
    requested: u32,
    move_by: u32,
    max_data_bytes: usize,
    framing: &FramingArgs,
    json: bool,
) -> Result<()> {
    if framing.pdu {
        bail!("Firmware data is only segmented into frames; drop --pdu");
    }
    let image = std::fs::read(firmware).with_context(|| format!("Failed to read firmware image at: {:?}", firmware))?;
    let segmenter = FirmwareSegmenter::new(framing.vendor, &image, max_data_bytes, framing.frame_config())?;
    info!(
        len = segmenter.firmware_len(),
        chunk = segmenter.max_data_bytes(),
        "Loaded firmware image"
    );
    if cursor > image.len() {
        warn!(cursor, len = image.len(), "Cursor is past the end of the image");
    }

    let out = segmenter.respond(cursor, requested, move_by);
    info!(
        frames = out.frames,
        sent = out.sent,
        next_cursor = out.next_cursor,
        "Answered data request"
    );

    if json {
        return print_json(&SegmentOutputView {
            frames: out.frames,
            sent: out.sent,
            next_cursor: out.next_cursor,
            hex: hex::encode(&out.bytes),
        });
    }
    println!("{}", hex_spaced(&out.bytes));
    Ok(())
}

fn emit(bytes: &[u8], json: bool) -> Result<()> {
    if json {
        return print_json(&EncodedOutput {
            len: bytes.len(),
            hex: hex::encode(bytes),
        });
    }
    println!("{}", hex_spaced(bytes));
    Ok(())
}

fn print_response(response: &Response, json: bool) -> Result<()> {
    if json {
        return print_json(response);
    }
    match response {
        Response::ApplicationVersion(version) => println!("Application version: {}", version),
        Response::DataBytesRequest(request) => println!(
            "Data bytes request: requested={} move_by={}",
            request.requested, request.move_by
        ),
    }
    Ok(())
}

fn print_decoded(decoded: &DecodedOutput, json: bool) -> Result<()> {
    if json {
        return print_json(decoded);
    }
    if let (Some(version), Some(checksum)) = (decoded.protocol_version, decoded.checksum) {
        println!("Protocol version: {}  checksum: {}", version, checksum);
    }
    println!("Vendor:  {:#06x} ({:?})", decoded.vendor_id, VendorId::from(decoded.vendor_id));
    println!(
        "Command: {:#06x} (feature {:#04x}, {}, id {:#04x})",
        decoded.command, decoded.feature_id, decoded.packet_type, decoded.command_id
    );
    if let Some(opcode) = decoded.upgrade_opcode {
        println!("Upgrade opcode: {:#04x}", opcode);
    }
    println!("Payload: {}", decoded.payload);
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
