//! Messages exchanged before the session is established.
//!
//! The order on the wire is: protocol version (both directions), security type
//! list and selection, optional VNC authentication challenge and response,
//! security result, client init, server init.

use core::fmt;

use ironvnc_core::{
    Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor, ensure_fixed_part_size, ensure_size,
    invalid_field_err, unsupported_value_err,
};

use crate::{MessageHint, ensure_enough};

/// An RFB protocol version, as carried by the 12-byte version string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl ProtocolVersion {
    const FIXED_PART_SIZE: usize = 12;

    /// The highest version this client implements.
    pub const RFB_3_8: Self = Self { major: 3, minor: 8 };

    /// Returns the element-wise minimum of two versions, compared major-first.
    pub fn min(self, other: Self) -> Self {
        core::cmp::min(self, other)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Encode for ProtocolVersion {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        let s = format!("RFB {:03}.{:03}\n", self.major, self.minor);
        debug_assert_eq!(s.len(), Self::FIXED_PART_SIZE);
        dst.write_slice(s.as_bytes());

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ProtocolVersion"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode for ProtocolVersion {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let bytes = src.read_array::<12>();

        if &bytes[..4] != b"RFB " || bytes[7] != b'.' || bytes[11] != b'\n' {
            return Err(invalid_field_err!("version", "malformed version string"));
        }

        let major = parse_version_field(&bytes[4..7])?;
        let minor = parse_version_field(&bytes[8..11])?;

        Ok(Self { major, minor })
    }
}

fn parse_version_field(digits: &[u8]) -> DecodeResult<u16> {
    let mut value = 0u16;

    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(invalid_field_err!("version", "non-digit in version field"));
        }
        value = value * 10 + u16::from(b - b'0');
    }

    Ok(value)
}

/// Framing hint for the server's 12-byte version string.
#[derive(Clone, Copy, Debug)]
pub struct ProtocolVersionHint;

impl MessageHint for ProtocolVersionHint {
    fn find_size(&self, bytes: &[u8]) -> DecodeResult<Option<usize>> {
        ensure_enough!(bytes, ProtocolVersion::FIXED_PART_SIZE);
        Ok(Some(ProtocolVersion::FIXED_PART_SIZE))
    }
}

/// A security type offered by the server or selected by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecurityType(pub u8);

impl SecurityType {
    /// Marker for a connection the server already refuses.
    pub const INVALID: Self = Self(0);
    /// No authentication.
    pub const NONE: Self = Self(1);
    /// DES challenge-response authentication.
    pub const VNC_AUTHENTICATION: Self = Self(2);
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "Invalid"),
            Self::NONE => write!(f, "None"),
            Self::VNC_AUTHENTICATION => write!(f, "VNCAuthentication"),
            Self(other) => write!(f, "Unknown({other})"),
        }
    }
}

impl Encode for SecurityType {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: 1);
        dst.write_u8(self.0);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SecurityType"
    }

    fn size(&self) -> usize {
        1
    }
}

/// The security type list sent by the server.
///
/// A zero count is the server's way of refusing the connection; the refusal
/// reason follows on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SupportedSecurityTypes {
    Types(Vec<SecurityType>),
    Failure(String),
}

impl Decode for SupportedSecurityTypes {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_size!(in: src, size: 1);

        let count = usize::from(src.read_u8());

        if count == 0 {
            let reason = decode_reason_string(src)?;
            return Ok(Self::Failure(reason));
        }

        ensure_size!(in: src, size: count);
        let types = src.read_slice(count).iter().copied().map(SecurityType).collect();

        Ok(Self::Types(types))
    }
}

/// Framing hint for the server's security type list.
#[derive(Clone, Copy, Debug)]
pub struct SupportedSecurityTypesHint;

impl MessageHint for SupportedSecurityTypesHint {
    fn find_size(&self, bytes: &[u8]) -> DecodeResult<Option<usize>> {
        ensure_enough!(bytes, 1);

        let count = usize::from(bytes[0]);

        if count == 0 {
            // Refusal: a length-prefixed reason string follows.
            ensure_enough!(bytes, 5);
            let reason_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
            ensure_enough!(bytes, 5 + reason_len);
            Ok(Some(5 + reason_len))
        } else {
            ensure_enough!(bytes, 1 + count);
            Ok(Some(1 + count))
        }
    }
}

/// The 16-byte challenge sent by the server for VNC authentication.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecurityChallenge(pub [u8; 16]);

impl Decode for SecurityChallenge {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_size!(in: src, size: 16);
        Ok(Self(src.read_array::<16>()))
    }
}

/// The 16-byte response the client computes from the challenge and password.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecurityResponse(pub [u8; 16]);

impl Encode for SecurityResponse {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: 16);
        dst.write_array(self.0);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SecurityResponse"
    }

    fn size(&self) -> usize {
        16
    }
}

/// Framing hint for the 16-byte authentication challenge.
#[derive(Clone, Copy, Debug)]
pub struct SecurityChallengeHint;

impl MessageHint for SecurityChallengeHint {
    fn find_size(&self, bytes: &[u8]) -> DecodeResult<Option<usize>> {
        ensure_enough!(bytes, 16);
        Ok(Some(16))
    }
}

/// Outcome of the security negotiation, as reported by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecurityResult {
    Ok,
    Failed(String),
}

impl Decode for SecurityResult {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_size!(in: src, size: 4);

        let status = src.read_u32_be();

        if status == 0 {
            Ok(Self::Ok)
        } else {
            let reason = decode_reason_string(src)?;
            Ok(Self::Failed(reason))
        }
    }
}

/// Framing hint for the security result.
///
/// The result is 4 bytes on success; a failure appends a length-prefixed
/// reason string.
#[derive(Clone, Copy, Debug)]
pub struct SecurityResultHint;

impl MessageHint for SecurityResultHint {
    fn find_size(&self, bytes: &[u8]) -> DecodeResult<Option<usize>> {
        ensure_enough!(bytes, 4);

        let status = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        if status == 0 {
            Ok(Some(4))
        } else {
            ensure_enough!(bytes, 8);
            let reason_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
            ensure_enough!(bytes, 8 + reason_len);
            Ok(Some(8 + reason_len))
        }
    }
}

/// The one-byte message concluding the client side of the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientInit {
    /// When set, the server keeps other clients connected.
    pub shared: bool,
}

impl Encode for ClientInit {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: 1);
        dst.write_u8(u8::from(self.shared));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ClientInit"
    }

    fn size(&self) -> usize {
        1
    }
}

/// How the server packs pixel values into bytes.
///
/// Immutable once received; the client never requests a different format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    pub bits_per_pixel: u8,
    pub depth: u8,
    pub big_endian: bool,
    pub true_color: bool,
    pub red_max: u16,
    pub green_max: u16,
    pub blue_max: u16,
    pub red_shift: u8,
    pub green_shift: u8,
    pub blue_shift: u8,
}

impl PixelFormat {
    const FIXED_PART_SIZE: usize = 16;

    /// Number of bytes a single pixel occupies on the wire.
    pub fn bytes_per_pixel(self) -> usize {
        usize::from(self.bits_per_pixel / 8)
    }
}

impl Encode for PixelFormat {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u8(self.bits_per_pixel);
        dst.write_u8(self.depth);
        dst.write_u8(u8::from(self.big_endian));
        dst.write_u8(u8::from(self.true_color));
        dst.write_u16_be(self.red_max);
        dst.write_u16_be(self.green_max);
        dst.write_u16_be(self.blue_max);
        dst.write_u8(self.red_shift);
        dst.write_u8(self.green_shift);
        dst.write_u8(self.blue_shift);
        dst.write_padding(3);

        Ok(())
    }

    fn name(&self) -> &'static str {
        "PixelFormat"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode for PixelFormat {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let bits_per_pixel = src.read_u8();
        let depth = src.read_u8();
        let big_endian = src.read_u8() != 0;
        let true_color = src.read_u8() != 0;
        let red_max = src.read_u16_be();
        let green_max = src.read_u16_be();
        let blue_max = src.read_u16_be();
        let red_shift = src.read_u8();
        let green_shift = src.read_u8();
        let blue_shift = src.read_u8();
        src.advance(3); // padding

        if bits_per_pixel % 8 != 0 {
            return Err(unsupported_value_err!(
                "bits-per-pixel",
                bits_per_pixel.to_string()
            ));
        }

        Ok(Self {
            bits_per_pixel,
            depth,
            big_endian,
            true_color,
            red_max,
            green_max,
            blue_max,
            red_shift,
            green_shift,
            blue_shift,
        })
    }
}

/// The server's initial message: framebuffer geometry, pixel format and name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInit {
    pub width: u16,
    pub height: u16,
    pub pixel_format: PixelFormat,
    pub name: String,
}

impl ServerInit {
    const FIXED_PART_SIZE: usize = 2 /* width */ + 2 /* height */ + PixelFormat::FIXED_PART_SIZE + 4 /* name len */;
}

impl Decode for ServerInit {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let width = src.read_u16_be();
        let height = src.read_u16_be();
        let pixel_format = PixelFormat::decode(src)?;

        let name_len = src.read_u32_be() as usize;
        ensure_size!(in: src, size: name_len);
        let name = String::from_utf8(src.read_slice(name_len).to_vec())
            .map_err(|e| ironvnc_core::invalid_field_err_with_source("ServerInit", "name", "not valid UTF-8", e))?;

        Ok(Self {
            width,
            height,
            pixel_format,
            name,
        })
    }
}

/// Framing hint for the variable-length server init message.
#[derive(Clone, Copy, Debug)]
pub struct ServerInitHint;

impl MessageHint for ServerInitHint {
    fn find_size(&self, bytes: &[u8]) -> DecodeResult<Option<usize>> {
        ensure_enough!(bytes, ServerInit::FIXED_PART_SIZE);

        let name_len = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]) as usize;
        ensure_enough!(bytes, ServerInit::FIXED_PART_SIZE + name_len);

        Ok(Some(ServerInit::FIXED_PART_SIZE + name_len))
    }
}

fn decode_reason_string(src: &mut ReadCursor<'_>) -> DecodeResult<String> {
    ensure_size!(ctx: "reason", in: src, size: 4);
    let len = src.read_u32_be() as usize;
    ensure_size!(ctx: "reason", in: src, size: len);

    Ok(String::from_utf8_lossy(src.read_slice(len)).into_owned())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const SERVER_INIT: &[u8] = &[
        0x04, 0x00, // width = 1024
        0x03, 0x00, // height = 768
        0x20, 0x18, 0x00, 0x01, // bpp = 32, depth = 24, little endian, true color
        0x00, 0xff, 0x00, 0xff, 0x00, 0xff, // maxima
        0x10, 0x08, 0x00, // shifts
        0x00, 0x00, 0x00, // padding
        0x00, 0x00, 0x00, 0x05, // name length = 5
        b'h', b'o', b's', b't', b'1', // name
    ];

    #[test]
    fn version_string_round_trip() {
        let encoded = ironvnc_core::encode_vec(&ProtocolVersion::RFB_3_8).unwrap();
        assert_eq!(encoded, b"RFB 003.008\n");

        let decoded: ProtocolVersion = ironvnc_core::decode(&encoded).unwrap();
        assert_eq!(decoded, ProtocolVersion::RFB_3_8);
    }

    #[test]
    fn version_rejects_malformed_string() {
        assert!(ironvnc_core::decode::<ProtocolVersion>(b"RBF 003.008\n").is_err());
        assert!(ironvnc_core::decode::<ProtocolVersion>(b"RFB 0x3.008\n").is_err());
    }

    #[rstest]
    #[case((3, 3), (3, 3))]
    #[case((3, 7), (3, 7))]
    #[case((3, 8), (3, 8))]
    #[case((3, 889), (3, 8))]
    #[case((4, 1), (3, 8))]
    fn version_negotiation_is_element_wise_minimum(#[case] server: (u16, u16), #[case] expected: (u16, u16)) {
        let server = ProtocolVersion {
            major: server.0,
            minor: server.1,
        };
        let expected = ProtocolVersion {
            major: expected.0,
            minor: expected.1,
        };

        assert_eq!(ProtocolVersion::RFB_3_8.min(server), expected);
    }

    #[test]
    fn security_types_list() {
        let decoded: SupportedSecurityTypes = ironvnc_core::decode(&[0x02, 0x02, 0x01]).unwrap();

        assert_eq!(
            decoded,
            SupportedSecurityTypes::Types(vec![SecurityType::VNC_AUTHENTICATION, SecurityType::NONE])
        );
    }

    #[test]
    fn security_types_refusal_carries_reason() {
        let decoded: SupportedSecurityTypes =
            ironvnc_core::decode(&[0x00, 0x00, 0x00, 0x00, 0x04, b'b', b'u', b's', b'y']).unwrap();

        assert_eq!(decoded, SupportedSecurityTypes::Failure("busy".to_owned()));
    }

    #[test]
    fn security_types_hint_waits_for_full_list() {
        let hint = SupportedSecurityTypesHint;

        assert_eq!(hint.find_size(&[0x02]).unwrap(), None);
        assert_eq!(hint.find_size(&[0x02, 0x02]).unwrap(), None);
        assert_eq!(hint.find_size(&[0x02, 0x02, 0x01]).unwrap(), Some(3));
        assert_eq!(hint.find_size(&[0x00, 0x00, 0x00, 0x00, 0x02]).unwrap(), None);
        assert_eq!(hint.find_size(&[0x00, 0x00, 0x00, 0x00, 0x02, b'n', b'o']).unwrap(), Some(7));
    }

    #[test]
    fn security_result_success() {
        let decoded: SecurityResult = ironvnc_core::decode(&[0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(decoded, SecurityResult::Ok);
    }

    #[test]
    fn security_result_failure_carries_reason() {
        let decoded: SecurityResult = ironvnc_core::decode(&[
            0x00, 0x00, 0x00, 0x01, // failed
            0x00, 0x00, 0x00, 0x03, // reason length
            b'b', b'a', b'd',
        ])
        .unwrap();

        assert_eq!(decoded, SecurityResult::Failed("bad".to_owned()));
    }

    #[test]
    fn security_result_hint_sizes() {
        let hint = SecurityResultHint;

        assert_eq!(hint.find_size(&[0x00, 0x00, 0x00, 0x00]).unwrap(), Some(4));
        assert_eq!(hint.find_size(&[0x00, 0x00, 0x00, 0x01]).unwrap(), None);
        assert_eq!(
            hint.find_size(&[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, b'n', b'o'])
                .unwrap(),
            Some(10)
        );
    }

    #[test]
    fn client_init_shared_flag() {
        assert_eq!(ironvnc_core::encode_vec(&ClientInit { shared: true }).unwrap(), [0x01]);
        assert_eq!(ironvnc_core::encode_vec(&ClientInit { shared: false }).unwrap(), [0x00]);
    }

    #[test]
    fn server_init_wire_layout() {
        let decoded: ServerInit = ironvnc_core::decode(SERVER_INIT).unwrap();

        assert_eq!(decoded.width, 1024);
        assert_eq!(decoded.height, 768);
        assert_eq!(decoded.name, "host1");
        assert_eq!(
            decoded.pixel_format,
            PixelFormat {
                bits_per_pixel: 32,
                depth: 24,
                big_endian: false,
                true_color: true,
                red_max: 255,
                green_max: 255,
                blue_max: 255,
                red_shift: 16,
                green_shift: 8,
                blue_shift: 0,
            }
        );
        assert_eq!(decoded.pixel_format.bytes_per_pixel(), 4);
    }

    #[test]
    fn server_init_hint_includes_name() {
        let hint = ServerInitHint;

        assert_eq!(hint.find_size(&SERVER_INIT[..24]).unwrap(), None);
        assert_eq!(hint.find_size(SERVER_INIT).unwrap(), Some(SERVER_INIT.len()));
    }

    #[test]
    fn pixel_format_rejects_fractional_bytes() {
        let mut bytes = SERVER_INIT.to_vec();
        bytes[4] = 15; // bits per pixel not a multiple of 8

        assert!(ironvnc_core::decode::<ServerInit>(&bytes).is_err());
    }
}
