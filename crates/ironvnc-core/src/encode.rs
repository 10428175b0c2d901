use core::fmt;

use crate::{
    InvalidFieldErr, NotEnoughBytesErr, OtherErr, UnexpectedMessageTypeErr, UnsupportedValueErr, WriteBuf,
    WriteCursor,
};

/// A result type for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// An error type for encoding operations, wrapping an [`EncodeErrorKind`].
pub type EncodeError = ironvnc_error::Error<EncodeErrorKind>;

/// Represents the different kinds of errors that can occur during encoding operations.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub enum EncodeErrorKind {
    /// Not enough bytes to complete the encoding operation.
    NotEnoughBytes {
        /// The number of bytes actually received.
        received: usize,
        /// The number of bytes expected or required.
        expected: usize,
    },
    /// A field in the data being encoded is invalid.
    InvalidField {
        /// The name of the invalid field.
        field: &'static str,
        /// The reason why the field is considered invalid.
        reason: &'static str,
    },
    /// An unexpected message type was encountered during encoding.
    UnexpectedMessageType {
        /// The unexpected message type that was received.
        got: u8,
    },
    /// An unsupported value was encountered during encoding.
    UnsupportedValue {
        /// The name of the field or parameter with the unsupported value.
        name: &'static str,
        /// The unsupported value that was received.
        value: String,
    },
    /// Any other error that doesn't fit into the above categories.
    Other {
        /// A description of the error.
        description: &'static str,
    },
}

impl std::error::Error for EncodeErrorKind {}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughBytes { received, expected } => write!(
                f,
                "not enough bytes provided to encode: received {received} bytes, expected {expected} bytes"
            ),
            Self::InvalidField { field, reason } => {
                write!(f, "invalid `{field}`: {reason}")
            }
            Self::UnexpectedMessageType { got } => {
                write!(f, "invalid message type ({got})")
            }
            Self::UnsupportedValue { name, value } => {
                write!(f, "unsupported {name} ({value})")
            }
            Self::Other { description } => {
                write!(f, "other ({description})")
            }
        }
    }
}

impl NotEnoughBytesErr for EncodeError {
    fn not_enough_bytes(context: &'static str, received: usize, expected: usize) -> Self {
        Self::new(context, EncodeErrorKind::NotEnoughBytes { received, expected })
    }

    fn with_source<S: ironvnc_error::Source>(self, source: S) -> Self {
        Self::with_source(self, source)
    }
}

impl InvalidFieldErr for EncodeError {
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self {
        Self::new(context, EncodeErrorKind::InvalidField { field, reason })
    }

    fn with_source<S: ironvnc_error::Source>(self, source: S) -> Self {
        Self::with_source(self, source)
    }
}

impl UnexpectedMessageTypeErr for EncodeError {
    fn unexpected_message_type(context: &'static str, got: u8) -> Self {
        Self::new(context, EncodeErrorKind::UnexpectedMessageType { got })
    }
}

impl UnsupportedValueErr for EncodeError {
    fn unsupported_value(context: &'static str, name: &'static str, value: String) -> Self {
        Self::new(context, EncodeErrorKind::UnsupportedValue { name, value })
    }
}

impl OtherErr for EncodeError {
    fn other(context: &'static str, description: &'static str) -> Self {
        Self::new(context, EncodeErrorKind::Other { description })
    }

    fn with_source<S: ironvnc_error::Source>(self, source: S) -> Self {
        Self::with_source(self, source)
    }
}

/// Message that can be encoded into its binary form.
///
/// The resulting binary payload is a fully encoded message that may be sent to the peer.
///
/// This trait is object-safe and may be used in a dynamic context.
pub trait Encode {
    /// Encodes this message in-place using the provided `WriteCursor`.
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()>;

    /// Returns the associated message name.
    fn name(&self) -> &'static str;

    /// Computes the size in bytes for this message.
    fn size(&self) -> usize;
}

crate::assert_obj_safe!(Encode);

/// Encodes the given message in-place into the provided buffer and returns the number of bytes written.
pub fn encode<T>(msg: &T, dst: &mut [u8]) -> EncodeResult<usize>
where
    T: Encode + ?Sized,
{
    let mut cursor = WriteCursor::new(dst);
    encode_cursor(msg, &mut cursor)?;
    Ok(cursor.pos())
}

/// Encodes the given message in-place using the provided `WriteCursor`.
pub fn encode_cursor<T>(msg: &T, dst: &mut WriteCursor<'_>) -> EncodeResult<()>
where
    T: Encode + ?Sized,
{
    msg.encode(dst)
}

/// Same as `encode` but resizes the buffer when it is too small to fit the message.
pub fn encode_buf<T>(msg: &T, buf: &mut WriteBuf) -> EncodeResult<usize>
where
    T: Encode + ?Sized,
{
    let msg_size = msg.size();
    let dst = buf.unfilled_to(msg_size);
    let written = encode(msg, dst)?;
    debug_assert_eq!(written, msg_size);
    buf.advance(written);
    Ok(written)
}

/// Same as `encode` but allocates and returns a new buffer each time.
///
/// This is a convenience function, but it's not very resource efficient.
pub fn encode_vec<T>(msg: &T) -> EncodeResult<Vec<u8>>
where
    T: Encode + ?Sized,
{
    let msg_size = msg.size();
    let mut buf = vec![0; msg_size];
    let written = encode(msg, buf.as_mut_slice())?;
    debug_assert_eq!(written, msg_size);
    Ok(buf)
}

/// Computes the size in bytes for this message.
pub fn size<T: Encode>(msg: &T) -> usize {
    msg.size()
}
