// SPDX-License-Identifier: MIT
//! Error taxonomy shared by readers and writers

/// Errors produced by the container codec
///
/// `EndOfData` is not a failure: it marks the end of the chunk sequence so
/// callers can loop until it shows up. Use [`ChunkError::is_end_of_data`]
/// rather than matching on I/O error kinds.
#[derive(Debug, thiserror::Error)]
pub enum ChunkError {
    #[error("end of data")]
    EndOfData,

    #[error("malformed container: {reason}")]
    MalformedContainer { reason: String },

    #[error("malformed chunk header{}: {reason}", fmt_offset(.offset))]
    MalformedHeader { offset: Option<u64>, reason: String },

    #[error(
        "payload truncated{}: expected {expected} octets, {actual} available",
        fmt_offset(.offset)
    )]
    PayloadTruncated {
        offset: Option<u64>,
        expected: u32,
        actual: u64,
    },

    #[error("requested {requested} octets from a chunk of {length}")]
    RequestExceedsChunk { requested: u32, length: u32 },

    #[error("chunk index {index} out of range (chunk count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("invalid type tag: {0}")]
    InvalidTypeTag(String),

    #[error("payload of {len} octets does not fit a 32-bit length")]
    PayloadTooLarge { len: usize },

    #[error("an earlier write failed; the container may end in a torn record")]
    WriterFailed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_offset(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!(" at offset {}", offset),
        None => String::new(),
    }
}

impl ChunkError {
    /// True for the end-of-data sentinel
    #[inline]
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, ChunkError::EndOfData)
    }

    /// True when the error leaves the reader unusable
    ///
    /// Caller mistakes (`RequestExceedsChunk`, `IndexOutOfRange`) and the
    /// end-of-data sentinel are not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ChunkError::EndOfData
                | ChunkError::RequestExceedsChunk { .. }
                | ChunkError::IndexOutOfRange { .. }
        )
    }
}

/// Result alias for container operations
pub type Result<T> = std::result::Result<T, ChunkError>;
