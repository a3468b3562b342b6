// SPDX-License-Identifier: MIT
//! Random access to chunks by index
//!
//! A [`ChunkSeeker`] makes one forward pass over the container when it is
//! opened, recording every chunk header and where it starts. Lookups then
//! seek straight to the recorded offset and re-read that one header, so no
//! payload is held in memory between calls.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{ChunkError, Result};
use crate::header::ChunkHeader;
use crate::source::Seekable;
use crate::stream::{Chunk, ChunkStream};
use crate::type_tag::TypeTag;

/// Where one chunk lives in the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub start_offset: u64,
    pub header: ChunkHeader,
}

/// Offset table built by a single scan, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkIndex {
    entries: Vec<IndexEntry>,
}

impl ChunkIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&IndexEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Indices of every chunk carrying `type_tag`
    pub fn positions_of<'a>(&'a self, type_tag: &'a TypeTag) -> impl Iterator<Item = usize> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, entry)| entry.header.type_tag == *type_tag)
            .map(|(i, _)| i)
    }
}

impl<'a> IntoIterator for &'a ChunkIndex {
    type Item = &'a IndexEntry;
    type IntoIter = std::slice::Iter<'a, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Indexed reader over a seekable container
///
/// Chunks appended after the index was built are not indexed, and a lookup
/// never reads past the end of its own chunk. A chunk whose header no longer
/// matches the index fails the lookup.
pub struct ChunkSeeker<R: Read + Seek> {
    stream: ChunkStream<Seekable<R>>,
    index: ChunkIndex,
}

impl ChunkSeeker<BufReader<File>> {
    /// Open and index a container file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "indexing container");
        Self::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> ChunkSeeker<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut stream = ChunkStream::from_seekable(reader)?;
        let index = scan(&mut stream)?;
        debug!(chunks = index.len(), "container indexed");
        Ok(Self { stream, index })
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    /// Indexed header of chunk `index`, without touching the source
    pub fn header(&self, index: usize) -> Result<&ChunkHeader> {
        self.entry(index).map(|entry| &entry.header)
    }

    /// Read chunk `index` in full
    pub fn find_chunk(&mut self, index: usize) -> Result<Chunk> {
        let entry = *self.entry(index)?;
        self.seek_to_entry(&entry)?;
        self.stream.take_chunk(entry.header.payload_len)
    }

    /// Read the first `count` payload octets of chunk `index`
    pub fn find_partial_chunk(&mut self, index: usize, count: u32) -> Result<Chunk> {
        let entry = *self.entry(index)?;
        if count > entry.header.payload_len {
            return Err(ChunkError::RequestExceedsChunk {
                requested: count,
                length: entry.header.payload_len,
            });
        }
        self.seek_to_entry(&entry)?;
        self.stream.take_chunk(count)
    }

    pub fn into_inner(self) -> R {
        self.stream.into_inner().into_inner()
    }

    fn entry(&self, index: usize) -> Result<&IndexEntry> {
        self.index.get(index).ok_or(ChunkError::IndexOutOfRange {
            index,
            count: self.index.len(),
        })
    }

    fn seek_to_entry(&mut self, entry: &IndexEntry) -> Result<()> {
        let found = self.stream.reposition(entry.start_offset)?;
        if !found.same_record(&entry.header) {
            return Err(ChunkError::MalformedHeader {
                offset: Some(entry.start_offset),
                reason: format!(
                    "expected {} ({} octets), found {} ({} octets)",
                    entry.header.type_tag,
                    entry.header.payload_len,
                    found.type_tag,
                    found.payload_len
                ),
            });
        }
        Ok(())
    }
}

fn scan<R: Read + Seek>(stream: &mut ChunkStream<Seekable<R>>) -> Result<ChunkIndex> {
    let mut entries = Vec::new();
    loop {
        let header = match stream.skip_chunk() {
            Ok(header) => header,
            Err(ChunkError::EndOfData) => break,
            Err(e) => return Err(e),
        };
        let Some(start_offset) = header.start_offset else {
            return Err(ChunkError::MalformedHeader {
                offset: None,
                reason: "source did not report a chunk offset".to_string(),
            });
        };
        entries.push(IndexEntry {
            start_offset,
            header,
        });
    }
    Ok(ChunkIndex { entries })
}
