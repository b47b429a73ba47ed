//! ## takt-core::chunks
//! **Bounded, single-pass queues of length-prefixed binary records**
//!
//! One producer appends during a bounded phase, one consumer drains to
//! empty, then `reset` reclaims the whole buffer for the next cycle. The
//! tick boundary is the barrier between the two phases; the queue itself
//! carries no locks or atomics.

pub mod queue;

pub use queue::{ChunkQueue, QueueError, CHUNK_HEADER_LEN};
