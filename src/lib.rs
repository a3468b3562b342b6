// SPDX-License-Identifier: MIT
//! # Piff: chunked binary container
//!
//! A chunk-oriented container for heterogeneous binary payloads such as
//! recorded media frames or structured log entries. A container is a fixed
//! magic/version header followed by self-describing, type-tagged,
//! length-prefixed records ("chunks"). Payload bytes are opaque to the codec.
//!
//! ## Key Features
//!
//! - **Sequential Reads**: [`ChunkStream`] keeps the next chunk header
//!   pre-fetched so callers can read, partially read, or skip each payload
//! - **Random Access**: [`ChunkSeeker`] indexes the container in one pass and
//!   then serves chunks by index with a single seek
//! - **Streaming Friendly**: forward-only sources (pipes, stdin) are read
//!   without seeking
//! - **Durable Appends**: [`ChunkWriter`] flushes and syncs every chunk
//!
//! ## Format Specification
//!
//! ```text
//! Piff container format v1
//! ========================
//!
//! Header (10 bytes):
//! - Magic: 89 'P' 'I' 'F' 'F' 0D 0A 1A 0A (9 bytes)
//! - Version: 1 (1 byte)
//!
//! Chunks (repeated until end of data, big-endian):
//! - Type tag: four-character code (4 bytes)
//! - Payload length: u32 (4 bytes)
//! - Payload: payload length bytes
//! ```
//!
//! There is no footer and no stored index; [`ChunkSeeker`] rebuilds its
//! offset table in memory on open.
//!
//! ## Usage
//!
//! ```rust
//! use piff::{ChunkSeeker, ChunkStream, ChunkWriter, TypeTag};
//! use std::io::Cursor;
//!
//! let mut writer = ChunkWriter::new(Vec::new()).unwrap();
//! writer.write_chunk_str("meta", b"{\"fps\":30}").unwrap();
//! writer.write_chunk(&TypeTag::new(*b"fram"), &[0u8; 64]).unwrap();
//! let data = writer.close().unwrap();
//!
//! // Sequential access
//! let mut stream = ChunkStream::from_reader(&data[..]).unwrap();
//! let meta = stream.read_chunk().unwrap();
//! assert!(meta.header.type_tag.eq_str("meta"));
//! let frame = stream.read_partial_chunk(4).unwrap();
//! assert_eq!(frame.payload.len(), 4);
//! assert!(stream.read_chunk().unwrap_err().is_end_of_data());
//!
//! // Random access
//! let mut seeker = ChunkSeeker::new(Cursor::new(data)).unwrap();
//! assert_eq!(seeker.chunk_count(), 2);
//! let frame = seeker.find_chunk(1).unwrap();
//! assert_eq!(frame.header.payload_len, 64);
//! ```
//!
//! ## Concurrency
//!
//! Readers and writers are synchronous and own their byte stream
//! exclusively. Sharing one across threads needs external locking.

pub mod error;
pub mod header;
pub mod options;
pub mod seeker;
pub mod source;
pub mod stream;
pub mod type_tag;
pub mod writer;

// Re-export main types
pub use error::{ChunkError, Result};
pub use header::{
    ChunkHeader, ContainerHeader, CHUNK_HEADER_SIZE, CONTAINER_HEADER_SIZE, FORMAT_VERSION, MAGIC,
};
pub use options::WriterOptions;
pub use seeker::{ChunkIndex, ChunkSeeker, IndexEntry};
pub use source::{ChunkSource, Forward, Seekable};
pub use stream::{Chunk, ChunkStream};
pub use type_tag::TypeTag;
pub use writer::{ChunkSink, ChunkWriter};
