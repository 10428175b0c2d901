#![doc = include_str!("../README.md")]

#[macro_use]
mod macros;

mod cursor;
mod decode;
mod encode;
mod write_buf;

// Flat API hierarchy of common traits and types

pub use self::cursor::*;
pub use self::decode::*;
pub use self::encode::*;
pub use self::write_buf::*;

/// Creates a "not enough bytes" error for any compatible error type.
pub fn not_enough_bytes_err<E: NotEnoughBytesErr>(context: &'static str, received: usize, expected: usize) -> E {
    E::not_enough_bytes(context, received, expected)
}

/// Creates an "invalid field" error for any compatible error type.
pub fn invalid_field_err<E: InvalidFieldErr>(context: &'static str, field: &'static str, reason: &'static str) -> E {
    E::invalid_field(context, field, reason)
}

/// Creates an "invalid field" error with a source attached.
pub fn invalid_field_err_with_source<E, S>(
    context: &'static str,
    field: &'static str,
    reason: &'static str,
    source: S,
) -> E
where
    E: InvalidFieldErr,
    S: ironvnc_error::Source,
{
    E::invalid_field(context, field, reason).with_source(source)
}

/// Creates an "unexpected message type" error for any compatible error type.
pub fn unexpected_message_type_err<E: UnexpectedMessageTypeErr>(context: &'static str, got: u8) -> E {
    E::unexpected_message_type(context, got)
}

/// Creates an "unsupported value" error for any compatible error type.
pub fn unsupported_value_err<E: UnsupportedValueErr>(
    context: &'static str,
    name: &'static str,
    value: String,
) -> E {
    E::unsupported_value(context, name, value)
}

/// Creates a generic error for any compatible error type.
pub fn other_err<E: OtherErr>(context: &'static str, description: &'static str) -> E {
    E::other(context, description)
}

/// Creates a generic error with a source attached.
pub fn other_err_with_source<E, S>(context: &'static str, description: &'static str, source: S) -> E
where
    E: OtherErr,
    S: ironvnc_error::Source,
{
    E::other(context, description).with_source(source)
}

/// Constructor contract for "not enough bytes" errors.
pub trait NotEnoughBytesErr: Sized {
    /// Creates the error.
    fn not_enough_bytes(context: &'static str, received: usize, expected: usize) -> Self;

    /// Attaches a source to the error.
    #[must_use]
    fn with_source<S: ironvnc_error::Source>(self, source: S) -> Self;
}

/// Constructor contract for "invalid field" errors.
pub trait InvalidFieldErr: Sized {
    /// Creates the error.
    fn invalid_field(context: &'static str, field: &'static str, reason: &'static str) -> Self;

    /// Attaches a source to the error.
    #[must_use]
    fn with_source<S: ironvnc_error::Source>(self, source: S) -> Self;
}

/// Constructor contract for "unexpected message type" errors.
pub trait UnexpectedMessageTypeErr: Sized {
    /// Creates the error.
    fn unexpected_message_type(context: &'static str, got: u8) -> Self;
}

/// Constructor contract for "unsupported value" errors.
pub trait UnsupportedValueErr: Sized {
    /// Creates the error.
    fn unsupported_value(context: &'static str, name: &'static str, value: String) -> Self;
}

/// Constructor contract for generic errors.
pub trait OtherErr: Sized {
    /// Creates the error.
    fn other(context: &'static str, description: &'static str) -> Self;

    /// Attaches a source to the error.
    #[must_use]
    fn with_source<S: ironvnc_error::Source>(self, source: S) -> Self;
}
