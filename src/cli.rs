use bytes::Bytes;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use gaia_lib::constants::DEFAULT_MAX_DATA_BYTES;
use gaia_lib::{FrameConfig, PacketType, VendorId, parse_hex};
use std::path::PathBuf;

/// Build and inspect GAIA v3/v4 packets.
#[derive(Parser, Debug)]
#[command(name = "gaia", author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub framing: FramingArgs,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    pub log_file: Option<PathBuf>,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Args, Debug, Clone)]
pub struct FramingArgs {
    /// Vendor id, decimal or 0x-prefixed hex
    #[arg(long, global = true, default_value_t = u16::from(VendorId::default()), value_parser = parse_u16)]
    pub vendor: u16,
    /// Protocol version written into frames
    #[arg(long = "protocol-version", global = true, default_value_t = 3)]
    pub protocol_version: u8,
    /// Append an XOR checksum to every frame
    #[arg(long, global = true)]
    pub checksum: bool,
    /// Work with bare PDUs (packet transport) instead of frames
    #[arg(long, global = true)]
    pub pdu: bool,
}

impl FramingArgs {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            protocol_version: self.protocol_version,
            use_checksum: self.checksum,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Build the "get application version" command
    VersionQuery,
    /// Build an upgrade-control command carrying one Upgrade Message
    UpgradeControl {
        /// Upgrade Message opcode
        #[arg(long, value_parser = parse_u8)]
        opcode: u8,
        /// Message content as hex
        #[arg(long, value_parser = parse_payload, default_value = "")]
        content: Bytes,
    },
    /// Build the RWCP endpoint-mode command
    Rwcp {
        /// Disable RWCP instead of enabling it
        #[arg(long)]
        disable: bool,
    },
    /// Build an arbitrary command from its fields
    Raw {
        #[arg(long, value_parser = parse_u8)]
        feature: u8,
        #[arg(long = "type", value_enum, default_value_t = PacketTypeArg::Command)]
        packet_type: PacketTypeArg,
        #[arg(long = "id", value_parser = parse_u8)]
        command_id: u8,
        /// Payload as hex
        #[arg(long, value_parser = parse_payload, default_value = "")]
        payload: Bytes,
    },
    /// Recognize a device message (version response or data request)
    Parse {
        /// Message bytes as hex; spaces and colons are ignored
        #[arg(required = true, num_args = 1..)]
        hex: Vec<String>,
    },
    /// Validate a frame and print its header fields
    Decode {
        #[arg(required = true, num_args = 1..)]
        hex: Vec<String>,
    },
    /// Answer one data request from a firmware image
    Segment {
        /// Firmware image file
        firmware: PathBuf,
        /// Current send cursor
        #[arg(long, default_value_t = 0)]
        cursor: usize,
        /// Bytes requested by the device
        #[arg(long, value_parser = parse_u32)]
        requested: u32,
        /// Forward skip requested by the device
        #[arg(long, value_parser = parse_u32, default_value = "0")]
        move_by: u32,
        /// Firmware bytes per frame
        #[arg(long, default_value_t = DEFAULT_MAX_DATA_BYTES)]
        max_data_bytes: usize,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketTypeArg {
    Command,
    Notification,
    Response,
    Error,
}

impl From<PacketTypeArg> for PacketType {
    fn from(arg: PacketTypeArg) -> Self {
        match arg {
            PacketTypeArg::Command => PacketType::Command,
            PacketTypeArg::Notification => PacketType::Notification,
            PacketTypeArg::Response => PacketType::Response,
            PacketTypeArg::Error => PacketType::Error,
        }
    }
}

fn parse_number<T: TryFrom<u32>>(input: &str) -> Result<T, String> {
    let value = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(digits) => u32::from_str_radix(digits, 16),
        None => input.parse::<u32>(),
    }
    .map_err(|e| format!("invalid number '{input}': {e}"))?;
    T::try_from(value).map_err(|_| format!("{input} is out of range"))
}

pub fn parse_u8(input: &str) -> Result<u8, String> {
    parse_number(input)
}

pub fn parse_u16(input: &str) -> Result<u16, String> {
    parse_number(input)
}

pub fn parse_u32(input: &str) -> Result<u32, String> {
    parse_number(input)
}

fn parse_payload(input: &str) -> Result<Bytes, String> {
    parse_hex(input).map(Bytes::from).map_err(|e| e.to_string())
}

/// Join positional hex words and decode them
pub fn hex_words(words: &[String]) -> Result<Vec<u8>, gaia_lib::GaiaError> {
    parse_hex(&words.join(" "))
}
