// SPDX-License-Identifier: MIT
//! Append-only chunk writer

use std::fs::File;
use std::io::{self, Cursor, Write};
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::error::{ChunkError, Result};
use crate::header::{ChunkHeader, ContainerHeader, CHUNK_HEADER_SIZE, CONTAINER_HEADER_SIZE};
use crate::options::WriterOptions;
use crate::type_tag::TypeTag;

/// A sink that can push written bytes to stable storage
pub trait ChunkSink: Write {
    /// Flush, then persist whatever the sink can persist
    fn make_durable(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl ChunkSink for File {
    fn make_durable(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl ChunkSink for Vec<u8> {}

impl<T> ChunkSink for Cursor<T> where Cursor<T>: Write {}

impl<T: ChunkSink + ?Sized> ChunkSink for &mut T {
    fn make_durable(&mut self) -> io::Result<()> {
        (**self).make_durable()
    }
}

/// Writes a container header once, then appends chunk records
///
/// Every [`write_chunk`](Self::write_chunk) call leaves no buffered state
/// behind: the record is flushed (and synced, with durable writes) before
/// the call returns. Once a record fails part way, later appends are
/// refused with `WriterFailed`.
pub struct ChunkWriter<W: ChunkSink> {
    sink: W,
    options: WriterOptions,
    chunks_written: u64,
    bytes_written: u64,
    failed: bool,
}

impl ChunkWriter<File> {
    /// Create or truncate `path` and write the container header
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "creating container");
        Self::new(File::create(path)?)
    }
}

impl<W: ChunkSink> ChunkWriter<W> {
    pub fn new(sink: W) -> Result<Self> {
        Self::with_options(sink, WriterOptions::default())
    }

    pub fn with_options(mut sink: W, options: WriterOptions) -> Result<Self> {
        ContainerHeader::write_to(&mut sink)?;
        let mut writer = Self {
            sink,
            options,
            chunks_written: 0,
            bytes_written: CONTAINER_HEADER_SIZE as u64,
            failed: false,
        };
        writer.persist()?;
        Ok(writer)
    }

    /// Append one chunk record
    pub fn write_chunk(&mut self, type_tag: &TypeTag, payload: &[u8]) -> Result<()> {
        if self.failed {
            return Err(ChunkError::WriterFailed);
        }
        let payload_len = u32::try_from(payload.len()).map_err(|_| ChunkError::PayloadTooLarge {
            len: payload.len(),
        })?;

        if let Err(e) = self.append_record(type_tag, payload_len, payload) {
            warn!(error = %e, offset = self.bytes_written, "chunk write failed");
            self.failed = true;
            return Err(e);
        }

        trace!(
            tag = %type_tag,
            payload_len,
            offset = self.bytes_written,
            "chunk written"
        );
        self.chunks_written += 1;
        self.bytes_written += (CHUNK_HEADER_SIZE + payload.len()) as u64;
        Ok(())
    }

    /// Append one chunk, naming its type with a 4-character string
    pub fn write_chunk_str(&mut self, type_tag: &str, payload: &[u8]) -> Result<()> {
        let type_tag: TypeTag = type_tag.parse()?;
        self.write_chunk(&type_tag, payload)
    }

    /// True after a failed append; the sink may hold a partial record
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn chunks_written(&self) -> u64 {
        self.chunks_written
    }

    /// Container size so far, header included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Flush and sync one last time, handing back the sink
    pub fn close(mut self) -> Result<W> {
        self.sink.make_durable()?;
        debug!(
            chunks = self.chunks_written,
            bytes = self.bytes_written,
            "container closed"
        );
        Ok(self.sink)
    }

    fn append_record(
        &mut self,
        type_tag: &TypeTag,
        payload_len: u32,
        payload: &[u8],
    ) -> Result<()> {
        ChunkHeader::write_to(&mut self.sink, type_tag, payload_len)?;
        self.sink.write_all(payload)?;
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        if self.options.durable_writes {
            self.sink.make_durable()?;
        } else {
            self.sink.flush()?;
        }
        Ok(())
    }
}
