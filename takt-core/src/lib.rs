//! # takt-core
//!
//! Memory foundation for the takt runtime: a one-block bump arena and the
//! bounded chunk queues carved out of it.
//!
//! ### Expectations (Production):
//! - One OS allocation at process start, one release at process end
//! - Zero per-message heap allocation on the tick path
//! - No locks: both structures are owned by exactly one thread and the
//!   tick boundary acts as the producer/consumer barrier
//!
//! ### Key Submodules:
//! - `alloc`: the linear arena and its region handles
//! - `chunks`: length-prefixed, resettable chunk queues

pub mod alloc;
pub mod chunks;

pub mod prelude {
    pub use crate::alloc::*;
    pub use crate::chunks::*;
}

pub use alloc::{Arena, ArenaError, ArenaRegion};
pub use chunks::{ChunkQueue, QueueError, CHUNK_HEADER_LEN};
