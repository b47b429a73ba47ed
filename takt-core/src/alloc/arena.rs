//! Bump-pointer arena allocator.
//!
//! Allocates by advancing an offset through one fixed block. There is no
//! per-region free: the block is released in one step when the arena drops.
//! Exhaustion is a provisioning defect, surfaced as [`ArenaError::Exhausted`]
//! so the caller decides how loudly to die.

// The arena hands out raw regions of its block and needs unsafe for that.
#![allow(unsafe_code)]

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use thiserror::Error;

/// Alignment of the backing block and of every region carved from it.
const REGION_ALIGN: usize = 16;

/// Arena error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    Exhausted { requested: usize, remaining: usize },
    #[error("invalid arena capacity {0}")]
    InvalidCapacity(usize),
    #[error("OS refused the backing block of {0} bytes")]
    BlockUnavailable(usize),
}

/// One fixed block, bump-pointer allocation, no individual release.
///
/// The arena is single-thread-owned; allocation takes `&mut self` and there
/// is deliberately no internal synchronization.
pub struct Arena {
    block: NonNull<u8>,
    capacity: usize,
    offset: usize,
}

impl Arena {
    /// Obtains the backing block from the OS. This is the process's one
    /// memory acquisition; everything else is carved from it.
    pub fn with_capacity(capacity: usize) -> Result<Self, ArenaError> {
        if capacity == 0 {
            return Err(ArenaError::InvalidCapacity(capacity));
        }
        let layout = Layout::from_size_align(capacity, REGION_ALIGN)
            .map_err(|_| ArenaError::InvalidCapacity(capacity))?;

        // SAFETY: layout has non-zero size, checked above.
        let raw = unsafe { alloc_zeroed(layout) };
        let block = NonNull::new(raw).ok_or(ArenaError::BlockUnavailable(capacity))?;

        Ok(Self {
            block,
            capacity,
            offset: 0,
        })
    }

    /// Returns the next `size` bytes as a region and advances the offset.
    ///
    /// Regions are pairwise disjoint and stay valid (and stable) for the
    /// arena's lifetime. Fails without disturbing prior allocations.
    pub fn allocate(&mut self, size: usize) -> Result<ArenaRegion, ArenaError> {
        if size == 0 {
            return Err(ArenaError::InvalidCapacity(size));
        }
        // Keep every region start aligned so callers can overlay structs.
        // offset <= capacity <= isize::MAX, so the align round-up cannot wrap.
        let start = (self.offset + REGION_ALIGN - 1) & !(REGION_ALIGN - 1);
        let end = match start.checked_add(size) {
            Some(end) if end <= self.capacity => end,
            _ => {
                return Err(ArenaError::Exhausted {
                    requested: size,
                    remaining: self.capacity - self.offset,
                })
            }
        };

        // SAFETY: start + size <= capacity, so the pointer stays inside the
        // block; `start` never exceeds isize::MAX because the allocation of
        // the block itself would have failed first.
        let ptr = unsafe { NonNull::new_unchecked(self.block.as_ptr().add(start)) };
        self.offset = end;
        Ok(ArenaRegion { ptr, len: size })
    }

    /// Total capacity of the backing block.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes consumed so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.offset
    }

    /// Bytes still available for allocation.
    pub fn remaining(&self) -> usize {
        self.capacity - self.offset
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: the block was allocated with exactly this layout and is
        // released exactly once, here.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.capacity, REGION_ALIGN);
            dealloc(self.block.as_ptr(), layout);
        }
    }
}

// SAFETY: the arena is a plain owned block; moving it between threads is
// fine as long as only one thread uses it, which `&mut self` enforces.
unsafe impl Send for Arena {}

/// A byte range handed out by [`Arena::allocate`].
///
/// Invariant: a region must not outlive the arena it came from. The runtime
/// enforces this by releasing the arena last during teardown; within this
/// workspace regions never escape the structures the arena backs.
#[derive(Debug)]
pub struct ArenaRegion {
    ptr: NonNull<u8>,
    len: usize,
}

impl ArenaRegion {
    /// Length of the region in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the region is zero-sized. Never constructed by the arena.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Views the region as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the region is in-bounds of a live block (type invariant)
        // and `&self` prevents a concurrent mutable view.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Views the region as a mutable byte slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above; `&mut self` guarantees exclusivity, and regions
        // from one arena never overlap.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Start address, for disjointness checks in tests.
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

// SAFETY: a region is an exclusive view of its byte range.
unsafe impl Send for ArenaRegion {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_disjoint_and_ordered() {
        let mut arena = Arena::with_capacity(4096).unwrap();
        let sizes = [64usize, 17, 128, 1];
        let mut regions = Vec::new();
        for size in sizes {
            regions.push(arena.allocate(size).unwrap());
        }
        for window in regions.windows(2) {
            let (a, b) = (&window[0], &window[1]);
            assert!(
                a.addr() + a.len() <= b.addr(),
                "regions overlap or are out of request order"
            );
        }
    }

    #[test]
    fn exhaustion_leaves_prior_allocations_intact() {
        let mut arena = Arena::with_capacity(64).unwrap();
        let mut first = arena.allocate(32).unwrap();
        first.as_mut_slice().fill(0xAB);

        let err = arena.allocate(64).unwrap_err();
        assert!(matches!(err, ArenaError::Exhausted { requested: 64, .. }));

        // The failed request moved nothing.
        assert!(first.as_slice().iter().all(|&b| b == 0xAB));
        assert_eq!(arena.used(), 32);

        // Smaller requests still succeed afterwards.
        arena.allocate(16).unwrap();
    }

    #[test]
    fn block_starts_zeroed() {
        let mut arena = Arena::with_capacity(256).unwrap();
        let region = arena.allocate(256).unwrap();
        assert!(region.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn accounting_tracks_offset() {
        let mut arena = Arena::with_capacity(1024).unwrap();
        assert_eq!(arena.remaining(), 1024);
        arena.allocate(100).unwrap();
        assert_eq!(arena.used(), 100);
        arena.allocate(10).unwrap();
        // Second region starts at the next 16-aligned offset (112).
        assert_eq!(arena.used(), 122);
        assert_eq!(arena.used() + arena.remaining(), 1024);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            Arena::with_capacity(0),
            Err(ArenaError::InvalidCapacity(0))
        ));
        let mut arena = Arena::with_capacity(16).unwrap();
        assert!(arena.allocate(0).is_err());
    }
}
