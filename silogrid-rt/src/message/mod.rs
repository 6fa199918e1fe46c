//! Universal message envelope and payload framing.
//!
//! The [`Envelope`] is the sole on-wire contract between silos: every
//! request and response travels as one, correlated by `message_id`.
//! Parameter payloads inside an envelope follow the length-prefixed
//! framing implemented in [`framing`].

mod envelope;
mod error;
mod framing;

pub use envelope::Envelope;
pub use error::{CallError, CodecError};
pub use framing::{FramingError, ParamReader, ParamWriter};
