// SPDX-License-Identifier: MIT
//! Container header and chunk header codecs
//!
//! ```text
//! Container header (10 bytes):
//! - Magic: 89 'P' 'I' 'F' 'F' 0D 0A 1A 0A (9 bytes)
//! - Version: 1 (1 byte)
//!
//! Chunk header (8 bytes, big-endian):
//! - Type tag (4 bytes)
//! - Payload length: u32 (4 bytes)
//! ```

use std::io::{ErrorKind, Read, Write};

use serde::Serialize;

use crate::error::{ChunkError, Result};
use crate::type_tag::{TypeTag, TYPE_TAG_SIZE};

/// Container magic bytes
pub const MAGIC: [u8; 9] = [0x89, b'P', b'I', b'F', b'F', 0x0D, 0x0A, 0x1A, 0x0A];

/// Current format version
pub const FORMAT_VERSION: u8 = 0x01;

/// Container header size in bytes
pub const CONTAINER_HEADER_SIZE: usize = MAGIC.len() + 1;

/// Chunk header size in bytes
pub const CHUNK_HEADER_SIZE: usize = TYPE_TAG_SIZE + 4;

/// Fill `buf` from `source`, returning how many octets were available.
/// Stops short only at end of input.
pub(crate) fn read_up_to<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// The fixed magic/version prefix of every container
pub struct ContainerHeader;

impl ContainerHeader {
    /// Header bytes for the current version
    pub fn to_bytes() -> [u8; CONTAINER_HEADER_SIZE] {
        let mut bytes = [0u8; CONTAINER_HEADER_SIZE];
        bytes[..MAGIC.len()].copy_from_slice(&MAGIC);
        bytes[MAGIC.len()] = FORMAT_VERSION;
        bytes
    }

    pub fn write_to<W: Write + ?Sized>(sink: &mut W) -> Result<()> {
        sink.write_all(&Self::to_bytes())?;
        Ok(())
    }

    /// Read and check the container header, leaving `source` at the first
    /// chunk header.
    pub fn verify<R: Read + ?Sized>(source: &mut R) -> Result<()> {
        let mut bytes = [0u8; CONTAINER_HEADER_SIZE];
        let available = read_up_to(source, &mut bytes)?;
        if available < CONTAINER_HEADER_SIZE {
            return Err(ChunkError::MalformedContainer {
                reason: format!(
                    "truncated header: {} of {} octets",
                    available, CONTAINER_HEADER_SIZE
                ),
            });
        }
        Self::check(&bytes)
    }

    fn check(bytes: &[u8; CONTAINER_HEADER_SIZE]) -> Result<()> {
        if bytes[..MAGIC.len()] != MAGIC {
            return Err(ChunkError::MalformedContainer {
                reason: "invalid magic bytes".to_string(),
            });
        }

        let version = bytes[MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(ChunkError::MalformedContainer {
                reason: format!(
                    "unsupported version: expected {}, got {}",
                    FORMAT_VERSION, version
                ),
            });
        }

        Ok(())
    }
}

/// The 8-octet prefix of every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkHeader {
    pub type_tag: TypeTag,

    /// Exact number of payload octets following the header
    pub payload_len: u32,

    /// Position of the header's first octet, when the source can tell
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<u64>,
}

impl ChunkHeader {
    pub fn new(type_tag: TypeTag, payload_len: u32) -> Self {
        Self {
            type_tag,
            payload_len,
            start_offset: None,
        }
    }

    pub fn encode(&self) -> [u8; CHUNK_HEADER_SIZE] {
        let mut bytes = [0u8; CHUNK_HEADER_SIZE];
        bytes[..TYPE_TAG_SIZE].copy_from_slice(self.type_tag.as_bytes());
        bytes[TYPE_TAG_SIZE..].copy_from_slice(&self.payload_len.to_be_bytes());
        bytes
    }

    pub fn decode(bytes: [u8; CHUNK_HEADER_SIZE], start_offset: Option<u64>) -> Self {
        let mut tag = [0u8; TYPE_TAG_SIZE];
        tag.copy_from_slice(&bytes[..TYPE_TAG_SIZE]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[TYPE_TAG_SIZE..]);

        Self {
            type_tag: TypeTag::new(tag),
            payload_len: u32::from_be_bytes(len),
            start_offset,
        }
    }

    /// Write a chunk header for a payload of `payload_len` octets
    pub fn write_to<W: Write + ?Sized>(
        sink: &mut W,
        type_tag: &TypeTag,
        payload_len: u32,
    ) -> Result<()> {
        sink.write_all(&Self::new(*type_tag, payload_len).encode())?;
        Ok(())
    }

    /// Read the next chunk header
    ///
    /// Returns `EndOfData` when the source is exhausted before the first
    /// octet, and `MalformedHeader` for a torn record.
    pub fn read_from<R: Read + ?Sized>(source: &mut R, start_offset: Option<u64>) -> Result<Self> {
        let mut bytes = [0u8; CHUNK_HEADER_SIZE];
        match read_up_to(source, &mut bytes)? {
            0 => Err(ChunkError::EndOfData),
            CHUNK_HEADER_SIZE => Ok(Self::decode(bytes, start_offset)),
            available => Err(ChunkError::MalformedHeader {
                offset: start_offset,
                reason: format!(
                    "torn record: {} of {} octets",
                    available, CHUNK_HEADER_SIZE
                ),
            }),
        }
    }

    /// Offset of the first payload octet
    #[inline]
    pub fn payload_offset(&self) -> Option<u64> {
        self.start_offset.map(|o| o + CHUNK_HEADER_SIZE as u64)
    }

    /// Offset of the header that follows this chunk
    #[inline]
    pub fn end_offset(&self) -> Option<u64> {
        self.payload_offset().map(|o| o + self.payload_len as u64)
    }

    /// Same tag and length, ignoring where the header was found
    pub fn same_record(&self, other: &ChunkHeader) -> bool {
        self.type_tag == other.type_tag && self.payload_len == other.payload_len
    }
}
