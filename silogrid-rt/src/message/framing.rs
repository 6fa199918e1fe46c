//! Length-prefixed per-parameter framing.
//!
//! Parameters are serialized as an ordered concatenation of segments: a
//! 32-bit little-endian length `L` followed by exactly `L` bytes produced
//! by the converter for that parameter. Readers hand each converter a
//! bounded view, so a converter bug in one parameter can never corrupt its
//! neighbors, and a converter can be swapped without re-framing the rest.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

// Layer 3: Internal module imports
use super::error::CallError;

/// Framing violation while reading or writing parameter segments.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// Length prefix was negative.
    #[error("negative parameter length {0}")]
    NegativeLength(i32),

    /// Declared length exceeds the remaining bytes.
    #[error("short read: parameter declares {declared} bytes, {available} available")]
    ShortRead {
        /// Bytes the length prefix declared.
        declared: usize,
        /// Bytes actually remaining.
        available: usize,
    },

    /// Fewer than 4 bytes remain where a length prefix was expected.
    #[error("truncated length prefix: {0} bytes remaining")]
    TruncatedPrefix(usize),

    /// Bytes remained after the declared parameters were consumed.
    #[error("{0} residual bytes after last parameter")]
    ResidualBytes(usize),

    /// A parameter exceeds the 32-bit length prefix.
    #[error("parameter of {0} bytes exceeds frame limit")]
    ParameterTooLarge(usize),
}

impl From<FramingError> for CallError {
    fn from(err: FramingError) -> Self {
        CallError::MalformedPayload(err.to_string())
    }
}

/// Writes parameters as length-prefixed segments.
///
/// # Example
/// ```ignore
/// use silogrid_rt::message::{ParamReader, ParamWriter};
///
/// let mut writer = ParamWriter::new();
/// writer.push(b"first")?;
/// writer.push(b"")?;
/// let payload = writer.finish();
///
/// let mut reader = ParamReader::new(payload);
/// assert_eq!(&reader.next()?[..], b"first");
/// assert!(reader.next()?.is_empty());
/// reader.finish()?;
/// ```
#[derive(Debug, Default)]
pub struct ParamWriter {
    buf: BytesMut,
}

impl ParamWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parameter segment.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), FramingError> {
        let len = i32::try_from(bytes.len())
            .map_err(|_| FramingError::ParameterTooLarge(bytes.len()))?;
        self.buf.put_i32_le(len);
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Number of bytes framed so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been framed yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Freeze into the payload bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads length-prefixed parameter segments from a payload.
///
/// Each [`ParamReader::next`] yields a bounded view of exactly the declared
/// length; the outer cursor only advances past a segment that validated.
/// Converters deserialize within that view and must consume it entirely
/// (serde slice deserializers reject trailing bytes, which is the
/// exact-consumption check).
#[derive(Debug)]
pub struct ParamReader {
    buf: Bytes,
}

impl ParamReader {
    /// Wrap a payload for reading.
    pub fn new(payload: Bytes) -> Self {
        Self { buf: payload }
    }

    /// Read the next parameter segment as a bounded view.
    pub fn next(&mut self) -> Result<Bytes, FramingError> {
        if self.buf.remaining() < 4 {
            return Err(FramingError::TruncatedPrefix(self.buf.remaining()));
        }
        // Peek the prefix without committing the cursor.
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&self.buf[..4]);
        let declared = i32::from_le_bytes(prefix);

        if declared < 0 {
            return Err(FramingError::NegativeLength(declared));
        }
        let declared = declared as usize;
        let available = self.buf.remaining() - 4;
        if declared > available {
            return Err(FramingError::ShortRead {
                declared,
                available,
            });
        }

        self.buf.advance(4);
        Ok(self.buf.split_to(declared))
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Assert that all parameters were consumed.
    pub fn finish(self) -> Result<(), FramingError> {
        if self.buf.has_remaining() {
            return Err(FramingError::ResidualBytes(self.buf.remaining()));
        }
        Ok(())
    }
}
