// SPDX-License-Identifier: MIT
//! Writer configuration

/// Options controlling how a [`ChunkWriter`](crate::ChunkWriter) persists chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    /// Sync each chunk to stable storage after flushing it.
    ///
    /// Flushing always happens; this adds `sync_data` for files.
    pub durable_writes: bool,
}

impl WriterOptions {
    /// Flush every chunk but skip the per-chunk storage sync
    pub fn buffered() -> Self {
        Self {
            durable_writes: false,
        }
    }

    pub fn with_durable_writes(mut self, durable_writes: bool) -> Self {
        self.durable_writes = durable_writes;
        self
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            durable_writes: true,
        }
    }
}
