//! Destinations for engine stdout.
//!
//! The executor streams stdout chunk by chunk into an [`OutputSink`] so that
//! nothing beyond the configured ceiling is ever held in memory.

use std::io;

/// Receives stdout chunks as the engine writes them.
pub trait OutputSink {
    /// Accepts one chunk. Chunks arrive in order and never include bytes past
    /// the output ceiling.
    ///
    /// # Errors
    ///
    /// Returning an error aborts the run and surfaces as
    /// [`ContainerError::Io`](crate::ContainerError::Io).
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardOutput;

impl OutputSink for DiscardOutput {
    fn write_chunk(&mut self, _chunk: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Collects stdout in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    bytes: Vec<u8>,
}

impl CapturedOutput {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Bytes collected so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes collected.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true when nothing was collected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl OutputSink for CapturedOutput {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.bytes.extend_from_slice(chunk);
        Ok(())
    }
}

/// Tracks bytes against the ceiling and decides how much of each chunk may
/// be delivered.
#[derive(Debug)]
pub(crate) struct OutputMeter {
    limit: u64,
    seen: u64,
}

/// What the meter allows for one chunk.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Metered {
    /// The whole chunk fits.
    Within,
    /// Only the first `allowed` bytes fit; the ceiling has been crossed.
    Exceeded { allowed: usize },
}

impl OutputMeter {
    pub(crate) const fn new(limit: u64) -> Self {
        Self { limit, seen: 0 }
    }

    pub(crate) fn record(&mut self, chunk_len: usize) -> Metered {
        let remaining = self.limit.saturating_sub(self.seen);
        let len = u64::try_from(chunk_len).unwrap_or(u64::MAX);
        self.seen = self.seen.saturating_add(len);
        if len <= remaining {
            return Metered::Within;
        }
        Metered::Exceeded {
            allowed: usize::try_from(remaining).unwrap_or(chunk_len),
        }
    }

    pub(crate) const fn seen(&self) -> u64 {
        self.seen
    }
}
