#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

#[macro_use]
mod macros;

pub mod keys;

mod dispatcher;
mod input;
mod pending;
mod session;

use core::fmt;

pub use ironvnc_connector::{Config, ConnectionResult, DesktopSize};
pub use ironvnc_pdu::client::PointerButtons;
pub use ironvnc_pdu::geometry::Rectangle;

pub use self::session::{FramebufferRegion, Session, SessionEventHandler, UpdateRequest};

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[non_exhaustive]
#[derive(Debug)]
pub enum SessionErrorKind {
    Encode(ironvnc_core::EncodeError),
    Decode(ironvnc_core::DecodeError),
    /// A rectangle arrived with an encoding this client never declared.
    ///
    /// Fatal: without knowing the payload length the stream cannot be
    /// realigned.
    UnsupportedEncoding(i32),
    /// The negotiated pixel format is not one raw decoding supports.
    UnsupportedPixelFormat {
        bits_per_pixel: u8,
    },
    /// An update request is already pending for the same rectangle.
    UpdateConflict,
    /// The session was closed.
    Closed,
    InvalidArgument(&'static str),
    Reason(String),
    General,
    Custom,
}

impl fmt::Display for SessionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SessionErrorKind::Encode(_) => write!(f, "encode error"),
            SessionErrorKind::Decode(_) => write!(f, "decode error"),
            SessionErrorKind::UnsupportedEncoding(encoding) => write!(f, "unsupported encoding ({encoding})"),
            SessionErrorKind::UnsupportedPixelFormat { bits_per_pixel } => {
                write!(f, "unsupported pixel format ({bits_per_pixel} bits per pixel)")
            }
            SessionErrorKind::UpdateConflict => write!(f, "an update request is already pending for this rectangle"),
            SessionErrorKind::Closed => write!(f, "session closed"),
            SessionErrorKind::InvalidArgument(description) => write!(f, "invalid argument: {description}"),
            SessionErrorKind::Reason(description) => write!(f, "reason: {description}"),
            SessionErrorKind::General => write!(f, "general error"),
            SessionErrorKind::Custom => write!(f, "custom error"),
        }
    }
}

impl std::error::Error for SessionErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self {
            SessionErrorKind::Encode(e) => Some(e),
            SessionErrorKind::Decode(e) => Some(e),
            _ => None,
        }
    }
}

pub type SessionError = ironvnc_error::Error<SessionErrorKind>;

pub trait SessionErrorExt {
    fn encode(error: ironvnc_core::EncodeError) -> Self;
    fn decode(error: ironvnc_core::DecodeError) -> Self;
    fn general(context: &'static str) -> Self;
    fn reason(context: &'static str, reason: impl Into<String>) -> Self;
    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static;
}

impl SessionErrorExt for SessionError {
    fn encode(error: ironvnc_core::EncodeError) -> Self {
        Self::new("encode message", SessionErrorKind::Encode(error))
    }

    fn decode(error: ironvnc_core::DecodeError) -> Self {
        Self::new("decode message", SessionErrorKind::Decode(error))
    }

    fn general(context: &'static str) -> Self {
        Self::new(context, SessionErrorKind::General)
    }

    fn reason(context: &'static str, reason: impl Into<String>) -> Self {
        Self::new(context, SessionErrorKind::Reason(reason.into()))
    }

    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static,
    {
        Self::new(context, SessionErrorKind::Custom).with_source(e)
    }
}

pub trait SessionResultExt {
    #[must_use]
    fn with_context(self, context: &'static str) -> Self;
    #[must_use]
    fn with_source<E>(self, source: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static;
}

impl<T> SessionResultExt for SessionResult<T> {
    fn with_context(self, context: &'static str) -> Self {
        self.map_err(|mut e| {
            e.context = context;
            e
        })
    }

    fn with_source<E>(self, source: E) -> Self
    where
        E: std::error::Error + Sync + Send + 'static,
    {
        self.map_err(|e| e.with_source(source))
    }
}
