// SPDX-License-Identifier: MIT
//! Sequential chunk reader with one-header lookahead
//!
//! The stream always holds the header of the next unread chunk (state
//! `Positioned`) or knows there is none (`Exhausted`). Callers can inspect
//! that header before choosing to read, partially read, or skip the
//! payload.
//!
//! A bad header found while loading the lookahead belongs to the next
//! record, so the chunk just read is still returned and the error is held
//! in `Failed` until the following call.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::error::{ChunkError, Result};
use crate::header::{ChunkHeader, ContainerHeader};
use crate::source::{ChunkSource, Forward, Seekable};

/// Upper bound on the up-front payload allocation; larger payloads grow as
/// their bytes actually arrive.
const PAYLOAD_PREALLOC_LIMIT: usize = 64 * 1024;

/// A chunk header together with the payload octets that were read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub header: ChunkHeader,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
enum StreamState {
    /// The next chunk's header has been read; its payload is next in the source
    Positioned(ChunkHeader),
    /// Loading the next header failed; the error surfaces on the next call
    Failed(ChunkError),
    /// No further chunks, either at end of data or after a failure
    Exhausted,
}

/// Reads chunks in file order from any [`ChunkSource`]
pub struct ChunkStream<S: ChunkSource> {
    source: S,
    state: StreamState,
}

impl ChunkStream<Seekable<BufReader<File>>> {
    /// Open a container file for sequential reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening container");
        Self::from_seekable(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> ChunkStream<Seekable<R>> {
    /// Read from a seekable source; headers carry their start offsets
    pub fn from_seekable(reader: R) -> Result<Self> {
        Self::new(Seekable::new(reader)?)
    }

    /// Seek to a chunk header at `offset` and make it the lookahead
    pub(crate) fn reposition(&mut self, offset: u64) -> Result<ChunkHeader> {
        if let Err(e) = self.source.seek_to(offset) {
            return self.fail(e.into());
        }
        self.refill()?;
        if let StreamState::Positioned(header) = self.state {
            return Ok(header);
        }
        self.fail(ChunkError::MalformedHeader {
            offset: Some(offset),
            reason: "no chunk header at indexed offset".to_string(),
        })
    }

    /// Read `count` payload octets of the positioned chunk and stop there
    ///
    /// Unlike [`read_partial_chunk`](ChunkStream::read_partial_chunk) this
    /// neither skips the rest of the payload nor loads the next header, so
    /// whatever follows the chunk is never looked at. The stream is left
    /// Exhausted until the next `reposition`.
    pub(crate) fn take_chunk(&mut self, count: u32) -> Result<Chunk> {
        let header = self.current()?;
        if count > header.payload_len {
            return Err(ChunkError::RequestExceedsChunk {
                requested: count,
                length: header.payload_len,
            });
        }
        let payload = self.read_payload(&header, count)?;
        self.state = StreamState::Exhausted;
        Ok(Chunk { header, payload })
    }
}

impl<R: Read> ChunkStream<Forward<R>> {
    /// Read from a forward-only source; headers carry no offsets
    pub fn from_reader(reader: R) -> Result<Self> {
        Self::new(Forward::new(reader))
    }
}

impl<S: ChunkSource> ChunkStream<S> {
    /// Verify the container header and load the first lookahead header
    pub fn new(mut source: S) -> Result<Self> {
        ContainerHeader::verify(&mut source)?;
        let mut stream = Self {
            source,
            state: StreamState::Exhausted,
        };
        stream.refill()?;
        debug!(first = ?stream.peek_header(), "container header verified");
        Ok(stream)
    }

    /// Header of the next chunk, without consuming it
    ///
    /// `None` both at the end and while a deferred error is pending; use
    /// [`is_exhausted`](Self::is_exhausted) to tell them apart.
    pub fn peek_header(&self) -> Option<&ChunkHeader> {
        match &self.state {
            StreamState::Positioned(header) => Some(header),
            _ => None,
        }
    }

    /// True once no call can yield anything but `EndOfData`
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, StreamState::Exhausted)
    }

    /// Read the next chunk's header and full payload
    pub fn read_chunk(&mut self) -> Result<Chunk> {
        let header = self.current()?;
        self.read_prefix(header, header.payload_len)
    }

    /// Read only the first `count` payload octets and skip the rest
    ///
    /// Fails with `RequestExceedsChunk` when `count` is larger than the
    /// chunk; the stream stays at that chunk.
    pub fn read_partial_chunk(&mut self, count: u32) -> Result<Chunk> {
        let header = self.current()?;
        if count > header.payload_len {
            return Err(ChunkError::RequestExceedsChunk {
                requested: count,
                length: header.payload_len,
            });
        }
        self.read_prefix(header, count)
    }

    /// Move past the next chunk without reading its payload
    pub fn skip_chunk(&mut self) -> Result<ChunkHeader> {
        let header = self.current()?;
        self.skip_remainder(&header, 0)?;
        self.advance();
        trace!(tag = %header.type_tag, len = header.payload_len, "chunk skipped");
        Ok(header)
    }

    pub fn get_ref(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn current(&mut self) -> Result<ChunkHeader> {
        match std::mem::replace(&mut self.state, StreamState::Exhausted) {
            StreamState::Positioned(header) => {
                self.state = StreamState::Positioned(header);
                Ok(header)
            }
            StreamState::Failed(err) => Err(err),
            StreamState::Exhausted => Err(ChunkError::EndOfData),
        }
    }

    fn read_prefix(&mut self, header: ChunkHeader, count: u32) -> Result<Chunk> {
        let payload = self.read_payload(&header, count)?;
        self.skip_remainder(&header, count)?;
        self.advance();
        trace!(
            tag = %header.type_tag,
            len = header.payload_len,
            read = count,
            "chunk read"
        );
        Ok(Chunk { header, payload })
    }

    /// Read exactly `count` octets from the start of the current payload
    fn read_payload(&mut self, header: &ChunkHeader, count: u32) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity((count as usize).min(PAYLOAD_PREALLOC_LIMIT));
        let result = (&mut self.source)
            .take(count as u64)
            .read_to_end(&mut payload);
        let read = match result {
            Ok(read) => read as u64,
            Err(e) => return self.fail(e.into()),
        };
        if read < count as u64 {
            return self.fail(ChunkError::PayloadTruncated {
                offset: header.start_offset,
                expected: header.payload_len,
                actual: read,
            });
        }
        Ok(payload)
    }

    /// Skip the `payload_len - consumed` octets left in the current payload
    fn skip_remainder(&mut self, header: &ChunkHeader, consumed: u32) -> Result<()> {
        let remaining = (header.payload_len - consumed) as u64;
        if remaining == 0 {
            return Ok(());
        }
        let skipped = match self.source.skip(remaining) {
            Ok(skipped) => skipped,
            Err(e) => return self.fail(e.into()),
        };
        if skipped < remaining {
            return self.fail(ChunkError::PayloadTruncated {
                offset: header.start_offset,
                expected: header.payload_len,
                actual: consumed as u64 + skipped,
            });
        }
        Ok(())
    }

    /// Load the next lookahead header, holding any failure for the next call
    fn advance(&mut self) {
        if let Err(err) = self.refill() {
            self.state = StreamState::Failed(err);
        }
    }

    /// Load the next lookahead header
    fn refill(&mut self) -> Result<()> {
        let offset = match self.source.position() {
            Ok(offset) => offset,
            Err(e) => return self.fail(e.into()),
        };
        match ChunkHeader::read_from(&mut self.source, offset) {
            Ok(header) => {
                self.state = StreamState::Positioned(header);
                Ok(())
            }
            Err(ChunkError::EndOfData) => {
                self.state = StreamState::Exhausted;
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&mut self, err: ChunkError) -> Result<T> {
        warn!(error = %err, "chunk stream failed");
        self.state = StreamState::Exhausted;
        Err(err)
    }
}

impl<S: ChunkSource> Iterator for ChunkStream<S> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_chunk() {
            Ok(chunk) => Some(Ok(chunk)),
            Err(ChunkError::EndOfData) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{CHUNK_HEADER_SIZE, CONTAINER_HEADER_SIZE};
    use crate::options::WriterOptions;
    use crate::type_tag::TypeTag;
    use crate::writer::ChunkWriter;
    use std::io::Cursor;

    fn container(chunks: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ChunkWriter::with_options(Vec::new(), WriterOptions::buffered()).unwrap();
        for (tag, payload) in chunks {
            writer.write_chunk_str(tag, payload).unwrap();
        }
        writer.close().unwrap()
    }

    #[test]
    fn test_read_chunks_in_order() {
        let data = container(&[("meta", b"{}"), ("data", b"hello")]);
        let mut stream = ChunkStream::from_seekable(Cursor::new(data)).unwrap();

        let first = stream.read_chunk().unwrap();
        assert!(first.header.type_tag.eq_str("meta"));
        assert_eq!(first.payload, b"{}");
        assert_eq!(first.header.start_offset, Some(CONTAINER_HEADER_SIZE as u64));

        let second = stream.read_chunk().unwrap();
        assert!(second.header.type_tag.eq_str("data"));
        assert_eq!(second.payload, b"hello");
        assert_eq!(second.header.start_offset, first.header.end_offset());

        assert!(stream.is_exhausted());
        assert!(stream.read_chunk().unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_empty_container_is_exhausted() {
        let data = container(&[]);
        let mut stream = ChunkStream::from_reader(&data[..]).unwrap();
        assert!(stream.is_exhausted());
        assert!(stream.peek_header().is_none());
        assert!(stream.skip_chunk().unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_end_of_data_is_repeatable() {
        let data = container(&[("once", b"x")]);
        let mut stream = ChunkStream::from_reader(&data[..]).unwrap();
        stream.read_chunk().unwrap();
        for _ in 0..3 {
            assert!(stream.read_chunk().unwrap_err().is_end_of_data());
            assert!(stream.read_partial_chunk(0).unwrap_err().is_end_of_data());
        }
    }

    #[test]
    fn test_peek_does_not_consume() {
        let data = container(&[("peek", b"abc")]);
        let mut stream = ChunkStream::from_reader(&data[..]).unwrap();
        let peeked = *stream.peek_header().unwrap();
        assert_eq!(peeked.payload_len, 3);
        assert_eq!(peeked.start_offset, None);
        assert_eq!(stream.read_chunk().unwrap().header, peeked);
    }

    #[test]
    fn test_partial_read_skips_remainder() {
        let data = container(&[("part", b"0123456789"), ("next", b"tail")]);
        for_both_sources(&data, |stream| {
            let partial = stream.read_partial_chunk(3).unwrap();
            assert_eq!(partial.payload, b"012");
            assert_eq!(partial.header.payload_len, 10);

            let next = stream.read_chunk().unwrap();
            assert!(next.header.type_tag.eq_str("next"));
            assert_eq!(next.payload, b"tail");
        });
    }

    #[test]
    fn test_partial_read_exceeding_chunk_keeps_position() {
        let data = container(&[("part", b"abcd")]);
        let mut stream = ChunkStream::from_reader(&data[..]).unwrap();
        let err = stream.read_partial_chunk(5).unwrap_err();
        assert!(matches!(
            err,
            ChunkError::RequestExceedsChunk {
                requested: 5,
                length: 4
            }
        ));
        assert_eq!(stream.read_chunk().unwrap().payload, b"abcd");
    }

    #[test]
    fn test_skip_chunk() {
        let data = container(&[("skip", &[7u8; 100]), ("keep", b"k")]);
        for_both_sources(&data, |stream| {
            let skipped = stream.skip_chunk().unwrap();
            assert_eq!(skipped.payload_len, 100);
            assert_eq!(stream.read_chunk().unwrap().payload, b"k");
        });
    }

    #[test]
    fn test_truncated_payload() {
        let mut data = container(&[("full", b"12345678")]);
        data.truncate(data.len() - 3);
        let mut stream = ChunkStream::from_seekable(Cursor::new(data)).unwrap();

        let err = stream.read_chunk().unwrap_err();
        assert!(matches!(
            err,
            ChunkError::PayloadTruncated {
                expected: 8,
                actual: 5,
                ..
            }
        ));
        // a failed stream cannot be advanced
        assert!(stream.is_exhausted());
        assert!(stream.read_chunk().unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_truncated_payload_on_skip() {
        let mut data = container(&[("full", b"12345678")]);
        data.truncate(data.len() - 1);
        for_both_sources(&data, |stream| {
            let err = stream.skip_chunk().unwrap_err();
            assert!(matches!(err, ChunkError::PayloadTruncated { actual: 7, .. }));
        });
    }

    #[test]
    fn test_torn_trailing_header() {
        let mut data = container(&[("good", b"ok")]);
        data.extend_from_slice(b"bad");
        let mut stream = ChunkStream::from_seekable(Cursor::new(data)).unwrap();

        // the intact chunk comes back; the torn header is reported next
        let chunk = stream.read_chunk().unwrap();
        assert_eq!(chunk.payload, b"ok");
        assert!(stream.peek_header().is_none());
        assert!(!stream.is_exhausted());

        let err = stream.read_chunk().unwrap_err();
        let expected_offset = (CONTAINER_HEADER_SIZE + CHUNK_HEADER_SIZE + 2) as u64;
        assert!(matches!(
            err,
            ChunkError::MalformedHeader { offset: Some(o), .. } if o == expected_offset
        ));
        assert!(stream.is_exhausted());
        assert!(stream.read_chunk().unwrap_err().is_end_of_data());
    }

    #[test]
    fn test_torn_header_after_skip_and_partial_read() {
        let mut data = container(&[("good", b"0123")]);
        data.extend_from_slice(b"bad");
        for_both_sources(&data, |stream| {
            assert_eq!(stream.skip_chunk().unwrap().payload_len, 4);
            let err = stream.read_partial_chunk(0).unwrap_err();
            assert!(matches!(err, ChunkError::MalformedHeader { .. }));
        });
        for_both_sources(&data, |stream| {
            assert_eq!(stream.read_partial_chunk(2).unwrap().payload, b"01");
            let err = stream.skip_chunk().unwrap_err();
            assert!(matches!(err, ChunkError::MalformedHeader { .. }));
            assert!(stream.skip_chunk().unwrap_err().is_end_of_data());
        });
    }

    #[test]
    fn test_iterator_yields_chunk_before_torn_header() {
        let mut data = container(&[("a000", b"1"), ("b000", b"22")]);
        data.extend_from_slice(&[0u8; 5]);
        let mut stream = ChunkStream::from_reader(&data[..]).unwrap();
        assert_eq!(stream.next().unwrap().unwrap().payload, b"1");
        assert_eq!(stream.next().unwrap().unwrap().payload, b"22");
        assert!(matches!(
            stream.next(),
            Some(Err(ChunkError::MalformedHeader { offset: None, .. }))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_torn_first_header_fails_open() {
        let mut data = container(&[]);
        data.extend_from_slice(&[1, 2, 3, 4, 5]);
        let err = ChunkStream::from_reader(&data[..]).err().unwrap();
        assert!(matches!(err, ChunkError::MalformedHeader { .. }));
    }

    #[test]
    fn test_bad_magic_fails_open() {
        let err = ChunkStream::from_reader(&b"not a container"[..]).err().unwrap();
        assert!(matches!(err, ChunkError::MalformedContainer { .. }));
    }

    #[test]
    fn test_iterator_collects_all_chunks() {
        let data = container(&[("a000", b"1"), ("b000", b""), ("c000", b"333")]);
        let stream = ChunkStream::from_reader(&data[..]).unwrap();
        let chunks: Vec<Chunk> = stream.collect::<Result<_>>().unwrap();
        let payloads: Vec<&[u8]> = chunks.iter().map(|c| c.payload.as_slice()).collect();
        assert_eq!(payloads, vec![&b"1"[..], &b""[..], &b"333"[..]]);
    }

    #[test]
    fn test_huge_declared_length_on_short_input() {
        let mut data = container(&[]);
        ChunkHeader::write_to(&mut data, &TypeTag::new(*b"huge"), u32::MAX).unwrap();
        data.extend_from_slice(b"tiny");
        let mut stream = ChunkStream::from_reader(&data[..]).unwrap();
        let err = stream.read_chunk().unwrap_err();
        assert!(matches!(err, ChunkError::PayloadTruncated { actual: 4, .. }));
    }

    fn for_both_sources(data: &[u8], check: impl Fn(&mut dyn ChunkReaderOps)) {
        let mut seekable = ChunkStream::from_seekable(Cursor::new(data.to_vec())).unwrap();
        check(&mut seekable);
        let mut forward = ChunkStream::from_reader(data).unwrap();
        check(&mut forward);
    }

    /// Object-safe view so one check can run over both source kinds
    trait ChunkReaderOps {
        fn read_chunk(&mut self) -> Result<Chunk>;
        fn read_partial_chunk(&mut self, count: u32) -> Result<Chunk>;
        fn skip_chunk(&mut self) -> Result<ChunkHeader>;
    }

    impl<S: ChunkSource> ChunkReaderOps for ChunkStream<S> {
        fn read_chunk(&mut self) -> Result<Chunk> {
            ChunkStream::read_chunk(self)
        }

        fn read_partial_chunk(&mut self, count: u32) -> Result<Chunk> {
            ChunkStream::read_partial_chunk(self, count)
        }

        fn skip_chunk(&mut self) -> Result<ChunkHeader> {
            ChunkStream::skip_chunk(self)
        }
    }
}
