//! Control channel protocol: command codes, messages and framing.

mod codec;
mod command;
mod message;
mod proptest;

pub use codec::Codec;
pub use command::{CommandCode, Direction, Verb};
pub use message::{Access, Request, Response, UserRegion};
