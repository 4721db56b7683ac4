use crate::constants::PDU_HEADER_SIZE;
use crate::error::GaiaError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The 2-bit packet type carried between feature id and command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum PacketType {
    Command = 0b00,
    Notification = 0b01,
    Response = 0b10,
    Error = 0b11,
}

impl PacketType {
    /// Interpret the low two bits. Every 2-bit value names a variant.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => PacketType::Command,
            0b01 => PacketType::Notification,
            0b10 => PacketType::Response,
            _ => PacketType::Error,
        }
    }
}

/// Well-known vendor ids. Anything else is carried through as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u16)]
pub enum VendorId {
    Qtil = 0x001D,
    Legacy = 0x000A,

    #[num_enum(catch_all)]
    Other(u16),
}

impl Default for VendorId {
    fn default() -> Self {
        VendorId::Qtil
    }
}

/// The 16-bit command description: `(feature << 9) | (type << 7) | command`.
///
/// Fields are declared least-significant first, so the little-endian view of
/// the two bytes is the numeric value. On the wire it is sent big-endian.
#[bitfield(bytes = 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescription {
    pub command_id: B7,
    pub packet_type_bits: B2,
    pub feature_id: B7,
}

impl CommandDescription {
    /// Pack the three fields. Out-of-range bits are masked off, never rejected.
    pub fn pack(feature_id: u8, packet_type: PacketType, command_id: u8) -> Self {
        CommandDescription::new()
            .with_command_id(command_id & 0x7F)
            .with_packet_type_bits(u8::from(packet_type) & 0b11)
            .with_feature_id(feature_id & 0x7F)
    }

    /// Split into `(feature_id, packet_type, command_id)`.
    pub fn unpack(self) -> (u8, PacketType, u8) {
        (self.feature_id(), self.packet_type(), self.command_id())
    }

    pub fn packet_type(&self) -> PacketType {
        PacketType::from_bits(self.packet_type_bits())
    }

    pub fn value(self) -> u16 {
        u16::from_le_bytes(self.into_bytes())
    }

    /// True when all three fields equal the expected ones.
    pub fn matches(&self, feature_id: u8, packet_type: PacketType, command_id: u8) -> bool {
        self.feature_id() == feature_id && self.packet_type() == packet_type && self.command_id() == command_id
    }
}

impl From<u16> for CommandDescription {
    fn from(value: u16) -> Self {
        CommandDescription::from_bytes(value.to_le_bytes())
    }
}

impl From<CommandDescription> for u16 {
    fn from(description: CommandDescription) -> Self {
        description.value()
    }
}

/// An addressed command: vendor id, command description and payload.
///
/// Serialized as `vendor_id(2, BE) + command(2, BE) + payload`. This is also
/// the complete packet for transports that frame packets themselves (GATT).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pdu {
    pub vendor_id: u16,
    pub command: CommandDescription,
    pub payload: Bytes,
}

impl Pdu {
    pub fn new(
        vendor_id: u16,
        feature_id: u8,
        packet_type: PacketType,
        command_id: u8,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            vendor_id,
            command: CommandDescription::pack(feature_id, packet_type, command_id),
            payload: payload.into(),
        }
    }

    pub fn feature_id(&self) -> u8 {
        self.command.feature_id()
    }

    pub fn command_id(&self) -> u8 {
        self.command.command_id()
    }

    pub fn packet_type(&self) -> PacketType {
        self.command.packet_type()
    }

    /// Header plus payload length
    pub fn encoded_len(&self) -> usize {
        PDU_HEADER_SIZE + self.payload.len()
    }

    pub(crate) fn put_into(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.vendor_id);
        buf.put_u16(self.command.value());
        buf.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.put_into(&mut buf);
        buf.freeze()
    }
}

impl From<Pdu> for Bytes {
    fn from(pdu: Pdu) -> Self {
        pdu.to_bytes()
    }
}

impl TryFrom<Bytes> for Pdu {
    type Error = GaiaError;

    fn try_from(mut bytes: Bytes) -> Result<Self, Self::Error> {
        if bytes.len() < PDU_HEADER_SIZE {
            return Err(GaiaError::PduTooShort { actual: bytes.len() });
        }
        let vendor_id = bytes.get_u16();
        let command = CommandDescription::from(bytes.get_u16());
        Ok(Pdu {
            vendor_id,
            command,
            payload: bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let cmd = CommandDescription::pack(0x06, PacketType::Notification, 0x00);
        assert_eq!(cmd.value(), (0x06 << 9) | (1 << 7));
        assert_eq!(cmd.value(), 0x0C80);

        let cmd = CommandDescription::pack(0x00, PacketType::Response, 0x05);
        assert_eq!(cmd.value(), 0x0105);
    }

    #[test]
    fn test_pack_masks_out_of_range_bits() {
        let cmd = CommandDescription::pack(0xFF, PacketType::Error, 0xFF);
        assert_eq!(cmd.value(), 0xFFFF);
        assert_eq!(cmd.feature_id(), 0x7F);
        assert_eq!(cmd.command_id(), 0x7F);

        let cmd = CommandDescription::pack(0x80, PacketType::Command, 0x80);
        assert_eq!(cmd.value(), 0x0000);
    }

    #[test]
    fn test_unpack_every_packet_type() {
        for (bits, expected) in [
            (0u16, PacketType::Command),
            (1, PacketType::Notification),
            (2, PacketType::Response),
            (3, PacketType::Error),
        ] {
            let cmd = CommandDescription::from((0x12 << 9) | (bits << 7) | 0x34);
            assert_eq!(cmd.unpack(), (0x12, expected, 0x34));
        }
    }

    #[test]
    fn test_packet_type_reads_low_two_bits() {
        assert_eq!(PacketType::from_bits(0b0000_0110), PacketType::Response);
        assert_eq!(PacketType::from_bits(0b1111_1101), PacketType::Notification);
        for packet_type in [
            PacketType::Command,
            PacketType::Notification,
            PacketType::Response,
            PacketType::Error,
        ] {
            assert_eq!(PacketType::from_bits(packet_type.into()), packet_type);
        }
    }

    #[test]
    fn test_vendor_id_catch_all() {
        assert_eq!(VendorId::from_primitive(0x001D), VendorId::Qtil);
        assert_eq!(VendorId::from_primitive(0x000A), VendorId::Legacy);
        assert_eq!(VendorId::from_primitive(0x1234), VendorId::Other(0x1234));
        assert_eq!(u16::from(VendorId::default()), 0x001D);
    }
}
