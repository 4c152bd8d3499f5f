//! Streaming byte codec for Bitcoin's wire format
//!
//! Fixed-width integers, 32-byte hashes, CompactSize integers and
//! length-prefixed byte strings, plus a tiny format language used to
//! read and write whole records in one call:
//!
//! | Code | Meaning |
//! |------|---------|
//! | `L`  | u32 little-endian |
//! | `Q`  | u64 little-endian |
//! | `h`  | u16 big-endian (network port) |
//! | `#`  | 32 raw bytes (hash) |
//! | `@`  | 16 raw bytes (IP) |
//! | `I`  | CompactSize |
//! | `S`  | CompactSize length then that many raw bytes |
//!
//! Writers always emit the minimal CompactSize form; readers accept any
//! well-formed encoding.

use crate::error::{ConsensusError, Result};
use crate::types::Hash;
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::borrow::Cow;
use std::io::{Cursor, Read};

fn insufficient(what: &'static str) -> ConsensusError {
    ConsensusError::Serialization(Cow::Owned(format!("insufficient bytes reading {what}")))
}

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the next byte without consuming it.
    pub fn peek_u8(&self) -> Option<u8> {
        self.peek_at(0)
    }

    /// Byte `offset` positions past the cursor, not consumed.
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.cursor.get_ref().get(self.position() + offset).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(|_| insufficient("u8"))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<BigEndian>()
            .map_err(|_| insufficient("u16"))
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| insufficient("u16"))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| insufficient("u32"))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| insufficient("u64"))
    }

    /// Reads exactly `len` bytes. The length is checked against what is left
    /// before anything is allocated.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        if len > self.remaining() {
            return Err(insufficient("byte string"));
        }
        let mut buf = vec![0u8; len];
        self.cursor
            .read_exact(&mut buf)
            .map_err(|_| insufficient("byte string"))?;
        Ok(buf)
    }

    pub fn read_hash(&mut self) -> Result<Hash> {
        let mut hash = [0u8; 32];
        self.cursor
            .read_exact(&mut hash)
            .map_err(|_| insufficient("hash"))?;
        Ok(hash)
    }

    pub fn read_ip(&mut self) -> Result<[u8; 16]> {
        let mut ip = [0u8; 16];
        self.cursor
            .read_exact(&mut ip)
            .map_err(|_| insufficient("ip address"))?;
        Ok(ip)
    }

    /// Reads a CompactSize ("satoshi int"), accepting non-minimal encodings.
    pub fn read_compact_size(&mut self) -> Result<u64> {
        match self.read_u8()? {
            0xfd => self.read_u16_le().map(u64::from),
            0xfe => self.read_u32_le().map(u64::from),
            0xff => self.read_u64_le(),
            n => Ok(u64::from(n)),
        }
    }

    /// Reads a CompactSize length followed by that many bytes.
    pub fn read_byte_string(&mut self) -> Result<Vec<u8>> {
        let len = self.read_compact_size()?;
        let len = usize::try_from(len).map_err(|_| insufficient("byte string"))?;
        self.read_bytes(len)
    }
}

/// Number of bytes the minimal CompactSize encoding of `n` occupies.
pub fn compact_size_len(n: u64) -> usize {
    if n < 0xfd {
        1
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Append-only writer producing wire-format bytes.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16_be(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64_le(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes the minimal CompactSize form of `n`.
    pub fn write_compact_size(&mut self, n: u64) {
        if n < 0xfd {
            self.buf.push(n as u8);
        } else if n <= 0xffff {
            self.buf.push(0xfd);
            self.write_u16_le(n as u16);
        } else if n <= 0xffff_ffff {
            self.buf.push(0xfe);
            self.write_u32_le(n as u32);
        } else {
            self.buf.push(0xff);
            self.write_u64_le(n);
        }
    }

    pub fn write_byte_string(&mut self, bytes: &[u8]) {
        self.write_compact_size(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }
}

/// One decoded value of the format language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    U32(u32),
    U64(u64),
    PortU16(u16),
    Hash(Hash),
    Ip([u8; 16]),
    CompactSize(u64),
    Bytes(Vec<u8>),
}

impl Field {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Field::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Field::U64(v) | Field::CompactSize(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<Hash> {
        match self {
            Field::Hash(h) => Some(*h),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Field::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

fn unknown_code(code: char) -> ConsensusError {
    ConsensusError::Serialization(Cow::Owned(format!("unknown format code {code:?}")))
}

/// Reads one value per code in `format`.
pub fn parse_struct(format: &str, reader: &mut ByteReader<'_>) -> Result<Vec<Field>> {
    format
        .chars()
        .map(|code| {
            Ok(match code {
                'L' => Field::U32(reader.read_u32_le()?),
                'Q' => Field::U64(reader.read_u64_le()?),
                'h' => Field::PortU16(reader.read_u16_be()?),
                '#' => Field::Hash(reader.read_hash()?),
                '@' => Field::Ip(reader.read_ip()?),
                'I' => Field::CompactSize(reader.read_compact_size()?),
                'S' => Field::Bytes(reader.read_byte_string()?),
                other => return Err(unknown_code(other)),
            })
        })
        .collect()
}

/// Writes `fields` according to `format`; each field must match its code.
pub fn stream_struct(format: &str, fields: &[Field], writer: &mut ByteWriter) -> Result<()> {
    if format.chars().count() != fields.len() {
        return Err(ConsensusError::Serialization(Cow::Borrowed(
            "format length does not match field count",
        )));
    }
    for (code, field) in format.chars().zip(fields) {
        match (code, field) {
            ('L', Field::U32(v)) => writer.write_u32_le(*v),
            ('Q', Field::U64(v)) => writer.write_u64_le(*v),
            ('h', Field::PortU16(v)) => writer.write_u16_be(*v),
            ('#', Field::Hash(h)) => writer.write_bytes(h),
            ('@', Field::Ip(ip)) => writer.write_bytes(ip),
            ('I', Field::CompactSize(v)) => writer.write_compact_size(*v),
            ('S', Field::Bytes(b)) => writer.write_byte_string(b),
            ('L' | 'Q' | 'h' | '#' | '@' | 'I' | 'S', other) => {
                return Err(ConsensusError::Serialization(Cow::Owned(format!(
                    "field {other:?} does not match format code {code:?}"
                ))))
            }
            (other, _) => return Err(unknown_code(other)),
        }
    }
    Ok(())
}
