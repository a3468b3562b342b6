// SPDX-License-Identifier: MIT
//! Byte-source adapters used by the chunk readers
//!
//! A reader needs two things beyond `Read`: to skip payload it does not
//! want, and (when possible) to know where each header starts. Seekable
//! sources answer both with `Seek`; forward-only sources such as pipes skip
//! by discarding and never report offsets.

use std::io::{self, Read, Seek, SeekFrom};

/// A readable source that can skip forward and maybe report its position
pub trait ChunkSource: Read {
    /// Current offset from the start of the stream, if known
    fn position(&mut self) -> io::Result<Option<u64>>;

    /// Advance by up to `count` octets, returning how many were skipped.
    /// A short count means the source ran out.
    fn skip(&mut self, count: u64) -> io::Result<u64>;
}

/// Adapter for sources that support `Seek`
///
/// The stream length is measured when the adapter is built and measured
/// again whenever a skip would run past it, so a container that is still
/// being appended to skips the same bytes it would read.
#[derive(Debug)]
pub struct Seekable<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> Seekable<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        let here = inner.stream_position()?;
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(here))?;
        Ok(Self { inner, len })
    }

    /// Length of the underlying stream as last measured
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Seekable<R> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Seek> ChunkSource for Seekable<R> {
    fn position(&mut self) -> io::Result<Option<u64>> {
        self.inner.stream_position().map(Some)
    }

    fn skip(&mut self, count: u64) -> io::Result<u64> {
        let here = self.inner.stream_position()?;
        if here.saturating_add(count) > self.len {
            self.len = self.inner.seek(SeekFrom::End(0))?;
            self.inner.seek(SeekFrom::Start(here))?;
        }
        let target = here.saturating_add(count).min(self.len.max(here));
        let offset = i64::try_from(target - here)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "skip too large"))?;
        self.inner.seek(SeekFrom::Current(offset))?;
        Ok(target - here)
    }
}

/// Adapter for forward-only sources (pipes, sockets, stdin)
#[derive(Debug)]
pub struct Forward<R> {
    inner: R,
}

impl<R: Read> Forward<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for Forward<R> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read> ChunkSource for Forward<R> {
    fn position(&mut self) -> io::Result<Option<u64>> {
        Ok(None)
    }

    fn skip(&mut self, count: u64) -> io::Result<u64> {
        io::copy(&mut (&mut self.inner).take(count), &mut io::sink())
    }
}
