//! Wire serialization
//!
//! [`stream`] holds the byte-level reader and writer; types that travel on
//! the wire implement [`Streamable`] on top of it.

pub mod stream;

pub use stream::{compact_size_len, parse_struct, stream_struct, ByteReader, ByteWriter, Field};

use crate::error::{ConsensusError, Result};
use std::borrow::Cow;

/// A value with a canonical wire encoding.
pub trait Streamable: Sized {
    fn stream(&self, writer: &mut ByteWriter);

    fn parse(reader: &mut ByteReader<'_>) -> Result<Self>;

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.stream(&mut writer);
        writer.into_bytes()
    }

    /// Parses a value that must consume `bytes` completely.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let value = Self::parse(&mut reader)?;
        if !reader.is_empty() {
            return Err(ConsensusError::Serialization(Cow::Owned(format!(
                "{} trailing bytes",
                reader.remaining()
            ))));
        }
        Ok(value)
    }
}
