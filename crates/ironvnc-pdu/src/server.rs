//! Server-to-client messages.
//!
//! RFB frames are not length-prefixed: the size of a framebuffer update
//! depends on the negotiated pixel format and on each rectangle's encoding.
//! [`ServerMessageHint`] walks the buffered bytes to delimit a whole message
//! before [`ServerMessage::decode`] runs.

use ironvnc_core::{
    Decode as _, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor, ensure_size,
    unexpected_message_type_err, unsupported_value_err,
};

use crate::geometry::Rectangle;
use crate::{Encoding, MessageHint, ensure_enough};

/// Content of a single rectangle within a framebuffer update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RectanglePayload {
    /// Uncompressed pixels in the negotiated format, row-major.
    Raw { pixels: Vec<u8> },
    /// No pixel data; the rectangle dimensions are the new framebuffer size.
    DesktopResize,
}

/// One rectangle of a framebuffer update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateRectangle {
    pub rect: Rectangle,
    pub payload: RectanglePayload,
}

impl UpdateRectangle {
    pub fn encoding(&self) -> Encoding {
        match self.payload {
            RectanglePayload::Raw { .. } => Encoding::RAW,
            RectanglePayload::DesktopResize => Encoding::DESKTOP_SIZE,
        }
    }
}

/// A message sent by the server after the handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    FramebufferUpdate(Vec<UpdateRectangle>),
    /// Palette update for indexed pixel formats. The color values are
    /// consumed from the stream but not retained.
    SetColorMapEntries {
        first_color: u16,
        colors_count: u16,
    },
    Bell,
    ServerCutText(String),
}

impl ServerMessage {
    pub const FRAMEBUFFER_UPDATE: u8 = 0;
    pub const SET_COLOR_MAP_ENTRIES: u8 = 1;
    pub const BELL: u8 = 2;
    pub const SERVER_CUT_TEXT: u8 = 3;

    /// Decodes one server message.
    ///
    /// `bytes_per_pixel` comes from the negotiated [`crate::handshake::PixelFormat`]
    /// and dictates the length of raw pixel payloads.
    pub fn decode(src: &mut ReadCursor<'_>, bytes_per_pixel: usize) -> DecodeResult<Self> {
        ensure_size!(in: src, size: 1);

        match src.read_u8() {
            Self::FRAMEBUFFER_UPDATE => {
                ensure_size!(in: src, size: 3);
                src.advance(1); // padding
                let count = usize::from(src.read_u16_be());

                let mut rectangles = Vec::with_capacity(count);

                for _ in 0..count {
                    let rect = Rectangle::decode(src)?;

                    ensure_size!(in: src, size: 4);
                    let encoding = Encoding(src.read_i32_be());

                    let payload = match encoding {
                        Encoding::RAW => {
                            let len = rect.area() * bytes_per_pixel;
                            ensure_size!(in: src, size: len);
                            RectanglePayload::Raw {
                                pixels: src.read_slice(len).to_vec(),
                            }
                        }
                        Encoding::DESKTOP_SIZE => RectanglePayload::DesktopResize,
                        Encoding(other) => {
                            return Err(unsupported_value_err!("encoding", other.to_string()));
                        }
                    };

                    rectangles.push(UpdateRectangle { rect, payload });
                }

                Ok(Self::FramebufferUpdate(rectangles))
            }
            Self::SET_COLOR_MAP_ENTRIES => {
                ensure_size!(in: src, size: 5);
                src.advance(1); // padding
                let first_color = src.read_u16_be();
                let colors_count = src.read_u16_be();

                // Three u16 samples per color, skipped.
                let colors_len = usize::from(colors_count) * 6;
                ensure_size!(in: src, size: colors_len);
                src.advance(colors_len);

                Ok(Self::SetColorMapEntries {
                    first_color,
                    colors_count,
                })
            }
            Self::BELL => Ok(Self::Bell),
            Self::SERVER_CUT_TEXT => {
                ensure_size!(in: src, size: 7);
                src.advance(3); // padding
                let len = src.read_u32_be() as usize;
                ensure_size!(in: src, size: len);
                let text = String::from_utf8_lossy(src.read_slice(len)).into_owned();

                Ok(Self::ServerCutText(text))
            }
            got => Err(unexpected_message_type_err!(got)),
        }
    }
}

impl Encode for ServerMessage {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        match self {
            Self::FramebufferUpdate(rectangles) => {
                dst.write_u8(Self::FRAMEBUFFER_UPDATE);
                dst.write_padding(1);
                dst.write_u16_be(ironvnc_core::cast_length!("rectangle count", rectangles.len())?);

                for update in rectangles {
                    update.rect.encode(dst)?;
                    dst.write_i32_be(update.encoding().0);

                    if let RectanglePayload::Raw { pixels } = &update.payload {
                        dst.write_slice(pixels);
                    }
                }
            }
            Self::SetColorMapEntries {
                first_color,
                colors_count,
            } => {
                dst.write_u8(Self::SET_COLOR_MAP_ENTRIES);
                dst.write_padding(1);
                dst.write_u16_be(*first_color);
                dst.write_u16_be(*colors_count);
                dst.write_padding(usize::from(*colors_count) * 6);
            }
            Self::Bell => dst.write_u8(Self::BELL),
            Self::ServerCutText(text) => {
                dst.write_u8(Self::SERVER_CUT_TEXT);
                dst.write_padding(3);
                dst.write_u32_be(ironvnc_core::cast_length!("text length", text.len())?);
                dst.write_slice(text.as_bytes());
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        match self {
            Self::FramebufferUpdate(_) => "FramebufferUpdate",
            Self::SetColorMapEntries { .. } => "SetColorMapEntries",
            Self::Bell => "Bell",
            Self::ServerCutText(_) => "ServerCutText",
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::FramebufferUpdate(rectangles) => {
                4 + rectangles
                    .iter()
                    .map(|update| {
                        12 + match &update.payload {
                            RectanglePayload::Raw { pixels } => pixels.len(),
                            RectanglePayload::DesktopResize => 0,
                        }
                    })
                    .sum::<usize>()
            }
            Self::SetColorMapEntries { colors_count, .. } => 6 + usize::from(*colors_count) * 6,
            Self::Bell => 1,
            Self::ServerCutText(text) => 8 + text.len(),
        }
    }
}

/// Framing hint for any post-handshake server message.
///
/// Walks rectangle headers to sum up a framebuffer update; an encoding this
/// client never declared is a protocol violation and leaves the stream
/// undelimitable, so it is reported as an error rather than skipped.
#[derive(Clone, Copy, Debug)]
pub struct ServerMessageHint {
    pub bytes_per_pixel: usize,
}

impl MessageHint for ServerMessageHint {
    fn find_size(&self, bytes: &[u8]) -> DecodeResult<Option<usize>> {
        ensure_enough!(bytes, 1);

        match bytes[0] {
            ServerMessage::FRAMEBUFFER_UPDATE => {
                ensure_enough!(bytes, 4);
                let count = usize::from(u16::from_be_bytes([bytes[2], bytes[3]]));

                let mut total = 4;

                for _ in 0..count {
                    // Rectangle header: geometry (8) + encoding (4).
                    ensure_enough!(bytes, total + 12);
                    let width = usize::from(u16::from_be_bytes([bytes[total + 4], bytes[total + 5]]));
                    let height = usize::from(u16::from_be_bytes([bytes[total + 6], bytes[total + 7]]));
                    let encoding = i32::from_be_bytes([
                        bytes[total + 8],
                        bytes[total + 9],
                        bytes[total + 10],
                        bytes[total + 11],
                    ]);
                    total += 12;

                    match Encoding(encoding) {
                        Encoding::RAW => total += width * height * self.bytes_per_pixel,
                        Encoding::DESKTOP_SIZE => {}
                        Encoding(other) => {
                            return Err(unsupported_value_err!("encoding", other.to_string()));
                        }
                    }
                }

                Ok(Some(total))
            }
            ServerMessage::SET_COLOR_MAP_ENTRIES => {
                ensure_enough!(bytes, 6);
                let count = usize::from(u16::from_be_bytes([bytes[4], bytes[5]]));
                Ok(Some(6 + count * 6))
            }
            ServerMessage::BELL => Ok(Some(1)),
            ServerMessage::SERVER_CUT_TEXT => {
                ensure_enough!(bytes, 8);
                let len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
                Ok(Some(8 + len))
            }
            got => Err(unexpected_message_type_err!(got)),
        }
    }
}
