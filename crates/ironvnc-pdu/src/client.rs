//! Client-to-server messages.
//!
//! Each message starts with its type byte. Decoding support exists so tests
//! can stand in for the server side.

use bitflags::bitflags;
use ironvnc_core::{
    Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor, cast_length, ensure_fixed_part_size,
    ensure_size, unexpected_message_type_err,
};

use crate::Encoding;
use crate::geometry::Rectangle;
use crate::handshake::PixelFormat;

/// Declares the pixel format the client wants the server to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetPixelFormat {
    pub pixel_format: PixelFormat,
}

impl SetPixelFormat {
    pub const MESSAGE_TYPE: u8 = 0;

    const FIXED_PART_SIZE: usize = 1 /* type */ + 3 /* padding */ + 16 /* pixel format */;
}

impl Encode for SetPixelFormat {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u8(Self::MESSAGE_TYPE);
        dst.write_padding(3);
        self.pixel_format.encode(dst)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "SetPixelFormat"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode for SetPixelFormat {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        read_message_type(src, Self::MESSAGE_TYPE)?;
        src.advance(3); // padding
        let pixel_format = PixelFormat::decode(src)?;

        Ok(Self { pixel_format })
    }
}

/// Declares the rectangle encodings the client understands, in preference order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetEncodings {
    pub encodings: Vec<Encoding>,
}

impl SetEncodings {
    pub const MESSAGE_TYPE: u8 = 2;

    const FIXED_PART_SIZE: usize = 1 /* type */ + 1 /* padding */ + 2 /* count */;
}

impl Encode for SetEncodings {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u8(Self::MESSAGE_TYPE);
        dst.write_padding(1);
        dst.write_u16_be(cast_length!("encoding count", self.encodings.len())?);

        for encoding in &self.encodings {
            dst.write_i32_be(encoding.0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "SetEncodings"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.encodings.len() * 4
    }
}

impl Decode for SetEncodings {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        read_message_type(src, Self::MESSAGE_TYPE)?;
        src.advance(1); // padding
        let count = usize::from(src.read_u16_be());

        ensure_size!(in: src, size: count * 4);
        let encodings = (0..count).map(|_| Encoding(src.read_i32_be())).collect();

        Ok(Self { encodings })
    }
}

/// Asks the server for the content of a framebuffer rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramebufferUpdateRequest {
    /// When set, the server may send only the pixels that changed since the
    /// last update of this area.
    pub incremental: bool,
    pub rect: Rectangle,
}

impl FramebufferUpdateRequest {
    pub const MESSAGE_TYPE: u8 = 3;

    const FIXED_PART_SIZE: usize = 1 /* type */ + 1 /* incremental */ + 8 /* rectangle */;
}

impl Encode for FramebufferUpdateRequest {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u8(Self::MESSAGE_TYPE);
        dst.write_u8(u8::from(self.incremental));
        self.rect.encode(dst)?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "FramebufferUpdateRequest"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode for FramebufferUpdateRequest {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        read_message_type(src, Self::MESSAGE_TYPE)?;
        let incremental = src.read_u8() != 0;
        let rect = Rectangle::decode(src)?;

        Ok(Self { incremental, rect })
    }
}

/// A key press or release, identified by its X11 keysym.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub down: bool,
    pub key: u32,
}

impl KeyEvent {
    pub const MESSAGE_TYPE: u8 = 4;

    const FIXED_PART_SIZE: usize = 1 /* type */ + 1 /* down */ + 2 /* padding */ + 4 /* key */;
}

impl Encode for KeyEvent {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u8(Self::MESSAGE_TYPE);
        dst.write_u8(u8::from(self.down));
        dst.write_padding(2);
        dst.write_u32_be(self.key);

        Ok(())
    }

    fn name(&self) -> &'static str {
        "KeyEvent"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode for KeyEvent {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        read_message_type(src, Self::MESSAGE_TYPE)?;
        let down = src.read_u8() != 0;
        src.advance(2); // padding
        let key = src.read_u32_be();

        Ok(Self { down, key })
    }
}

bitflags! {
    /// State of the pointer buttons, one bit per button, set while pressed.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct PointerButtons: u8 {
        const LEFT = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT = 1 << 2;
        const WHEEL_UP = 1 << 3;
        const WHEEL_DOWN = 1 << 4;
        const BUTTON_6 = 1 << 5;
        const BUTTON_7 = 1 << 6;
        const BUTTON_8 = 1 << 7;
    }
}

/// Pointer position and button state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointerEvent {
    pub buttons: PointerButtons,
    pub x: u16,
    pub y: u16,
}

impl PointerEvent {
    pub const MESSAGE_TYPE: u8 = 5;

    const FIXED_PART_SIZE: usize = 1 /* type */ + 1 /* buttons */ + 2 /* x */ + 2 /* y */;
}

impl Encode for PointerEvent {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);

        dst.write_u8(Self::MESSAGE_TYPE);
        dst.write_u8(self.buttons.bits());
        dst.write_u16_be(self.x);
        dst.write_u16_be(self.y);

        Ok(())
    }

    fn name(&self) -> &'static str {
        "PointerEvent"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode for PointerEvent {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        read_message_type(src, Self::MESSAGE_TYPE)?;
        let buttons = PointerButtons::from_bits_retain(src.read_u8());
        let x = src.read_u16_be();
        let y = src.read_u16_be();

        Ok(Self { buttons, x, y })
    }
}

/// Sends the client clipboard content to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCutText {
    pub text: String,
}

impl ClientCutText {
    pub const MESSAGE_TYPE: u8 = 6;

    const FIXED_PART_SIZE: usize = 1 /* type */ + 3 /* padding */ + 4 /* length */;
}

impl Encode for ClientCutText {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u8(Self::MESSAGE_TYPE);
        dst.write_padding(3);
        dst.write_u32_be(cast_length!("text length", self.text.len())?);
        dst.write_slice(self.text.as_bytes());

        Ok(())
    }

    fn name(&self) -> &'static str {
        "ClientCutText"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.text.len()
    }
}

impl Decode for ClientCutText {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        read_message_type(src, Self::MESSAGE_TYPE)?;
        src.advance(3); // padding
        let len = src.read_u32_be() as usize;

        ensure_size!(in: src, size: len);
        let text = String::from_utf8_lossy(src.read_slice(len)).into_owned();

        Ok(Self { text })
    }
}

fn read_message_type(src: &mut ReadCursor<'_>, expected: u8) -> DecodeResult<()> {
    let got = src.read_u8();

    if got == expected {
        Ok(())
    } else {
        Err(unexpected_message_type_err!(got))
    }
}
