#![doc = include_str!("../README.md")]

#[macro_use]
extern crate tracing;

mod connector;
mod framed;

pub use self::connector::*;
pub use self::framed::*;
