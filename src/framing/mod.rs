//! Message framing and deframing (C3): `<channel>:<payload>$HHHH\n`,
//! optionally ECB-encrypted under a [`crate::cipher::BlockCipher`].

mod checksum;
mod deframer;
mod frame;
mod message;

/// An incrementally-updated checksum accumulator.
pub use checksum::Checksum;
/// Byte-at-a-time deframing state machine and its default line bound.
pub use deframer::{Deframer, DEFAULT_MAX_LINE};
/// One-shot frame assembly.
pub use frame::encode;
/// A single framed protocol message.
pub use message::Message;
