#![doc = include_str!("../README.md")]

pub mod client;
pub mod geometry;
pub mod handshake;
pub mod server;

use ironvnc_core::DecodeResult;

/// A rectangle encoding negotiated between client and server.
///
/// Only [`Encoding::RAW`] carries pixel data this client understands; the
/// [`Encoding::DESKTOP_SIZE`] pseudo-encoding carries no pixel data and
/// announces a framebuffer resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Encoding(pub i32);

impl Encoding {
    /// Uncompressed pixel data, one sample per pixel per channel.
    pub const RAW: Self = Self(0);
    /// Pseudo-encoding announcing a framebuffer resize.
    pub const DESKTOP_SIZE: Self = Self(-223);
}

impl From<i32> for Encoding {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<Encoding> for i32 {
    fn from(value: Encoding) -> Self {
        value.0
    }
}

/// Finds the size of the next complete message given the bytes buffered so far.
///
/// Returns `Ok(None)` when more bytes are needed, and an error when the buffered
/// bytes cannot possibly delimit a message this client understands (in which case
/// the stream is beyond recovery, since RFB frames are not self-describing).
pub trait MessageHint: Send + Sync {
    /// Tries to find the size of the next message.
    fn find_size(&self, bytes: &[u8]) -> DecodeResult<Option<usize>>;
}

ironvnc_core::assert_obj_safe!(MessageHint);

macro_rules! ensure_enough {
    ($bytes:expr, $len:expr) => {
        if $bytes.len() < $len {
            return Ok(None);
        }
    };
}

pub(crate) use ensure_enough;
