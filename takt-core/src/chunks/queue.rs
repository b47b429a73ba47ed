//! Append-only chunk queue over an arena region.
//!
//! A chunk is `[u32 LE length][payload]` written at the write cursor. The
//! queue is non-circular: cumulative writes between resets must fit the
//! region, and `reset` is the only way to reclaim space. Exhaustion of the
//! reader is signalled solely by `read` returning `None` — no separate
//! count is tracked.

use thiserror::Error;

use crate::alloc::ArenaRegion;

/// Bytes of framing added to every chunk (the u32 LE length prefix).
pub const CHUNK_HEADER_LEN: usize = 4;

/// Chunk queue error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("chunk queue capacity exceeded: needed {needed} bytes, {remaining} remaining")]
    CapacityExceeded { needed: usize, remaining: usize },
    #[error("chunk of {0} bytes exceeds the u32 length prefix")]
    OversizedChunk(usize),
}

/// Bounded, append-only sequence of length-prefixed records.
///
/// Bound once to a region at startup; written by one producer phase,
/// drained by one consumer phase, reset at the cycle end. Dropping the
/// queue releases nothing — the backing storage belongs to the arena.
pub struct ChunkQueue {
    region: ArenaRegion,
    write: usize,
    read: usize,
}

impl ChunkQueue {
    /// Binds the queue to a caller-supplied region and zeroes both cursors.
    pub fn bind(region: ArenaRegion) -> Self {
        Self {
            region,
            write: 0,
            read: 0,
        }
    }

    /// Appends a length-prefixed copy of `chunk` at the write cursor.
    ///
    /// Fails without corrupting chunks written earlier in the same cycle.
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), QueueError> {
        let prefix =
            u32::try_from(chunk.len()).map_err(|_| QueueError::OversizedChunk(chunk.len()))?;
        let needed = CHUNK_HEADER_LEN + chunk.len();
        let remaining = self.region.len() - self.write;
        if needed > remaining {
            return Err(QueueError::CapacityExceeded { needed, remaining });
        }

        let start = self.write;
        let buf = self.region.as_mut_slice();
        buf[start..start + CHUNK_HEADER_LEN].copy_from_slice(&prefix.to_le_bytes());
        buf[start + CHUNK_HEADER_LEN..start + needed].copy_from_slice(chunk);
        self.write = start + needed;
        Ok(())
    }

    /// Returns the chunk at the read cursor and advances past it, or `None`
    /// once the read cursor has caught up with the write cursor.
    pub fn read(&mut self) -> Option<&[u8]> {
        if self.read == self.write {
            return None;
        }
        let start = self.read;
        let buf = self.region.as_slice();
        let mut prefix = [0u8; CHUNK_HEADER_LEN];
        prefix.copy_from_slice(&buf[start..start + CHUNK_HEADER_LEN]);
        let len = u32::from_le_bytes(prefix) as usize;
        self.read = start + CHUNK_HEADER_LEN + len;
        Some(&buf[start + CHUNK_HEADER_LEN..start + CHUNK_HEADER_LEN + len])
    }

    /// Zeroes both cursors, reclaiming the whole buffer for the next cycle.
    pub fn reset(&mut self) {
        self.write = 0;
        self.read = 0;
    }

    /// True once the consumer has drained everything the producer wrote.
    pub fn is_drained(&self) -> bool {
        self.read == self.write
    }

    /// Capacity of the backing region in bytes, framing included.
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Bytes written this cycle, framing included.
    pub fn written(&self) -> usize {
        self.write
    }
}
