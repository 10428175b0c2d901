//! X11 keysym values for the keys RFC 6143 §7.5.4 calls out, plus the
//! character-to-keysym mapping used by text input.

pub const BACKSPACE: u32 = 0xff08;
pub const TAB: u32 = 0xff09;
pub const RETURN: u32 = 0xff0d;
pub const ESCAPE: u32 = 0xff1b;
pub const INSERT: u32 = 0xff63;
pub const DELETE: u32 = 0xffff;
pub const HOME: u32 = 0xff50;
pub const END: u32 = 0xff57;
pub const PAGE_UP: u32 = 0xff55;
pub const PAGE_DOWN: u32 = 0xff56;
pub const LEFT: u32 = 0xff51;
pub const UP: u32 = 0xff52;
pub const RIGHT: u32 = 0xff53;
pub const DOWN: u32 = 0xff54;
pub const F1: u32 = 0xffbe;
pub const F2: u32 = 0xffbf;
pub const F3: u32 = 0xffc0;
pub const F4: u32 = 0xffc1;
pub const F5: u32 = 0xffc2;
pub const F6: u32 = 0xffc3;
pub const F7: u32 = 0xffc4;
pub const F8: u32 = 0xffc5;
pub const F9: u32 = 0xffc6;
pub const F10: u32 = 0xffc7;
pub const F11: u32 = 0xffc8;
pub const F12: u32 = 0xffc9;
pub const SHIFT_LEFT: u32 = 0xffe1;
pub const SHIFT_RIGHT: u32 = 0xffe2;
pub const CONTROL_LEFT: u32 = 0xffe3;
pub const CONTROL_RIGHT: u32 = 0xffe4;
pub const META_LEFT: u32 = 0xffe7;
pub const META_RIGHT: u32 = 0xffe8;
pub const ALT_LEFT: u32 = 0xffe9;
pub const ALT_RIGHT: u32 = 0xffea;

/// Converts a character to its keysym.
///
/// Latin-1 characters map directly; anything else uses the X11 rule of
/// the Unicode code point offset by `0x0100_0000`.
pub fn from_char(c: char) -> u32 {
    let code = u32::from(c);

    if code <= 0xff { code } else { code | 0x0100_0000 }
}
