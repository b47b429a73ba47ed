//! ## takt-core::alloc
//! **Linear arena over one fixed block**
//!
//! Every long-lived buffer in the process (event queue, command queue,
//! application scratch) is a region of a single block obtained from the OS
//! exactly once at startup. Regions are handed out sequentially and never
//! individually released; dropping the arena releases the whole block.

pub mod arena;

pub use arena::{Arena, ArenaError, ArenaRegion};
