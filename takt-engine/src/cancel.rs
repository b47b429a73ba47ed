//! Cooperative cancellation token.
//!
//! Replaces the original's signal-handler global: one designated setter,
//! read only at tick boundaries. A request set mid-tick is acted on before
//! the next poll-drain begins, so records already drained for the current
//! tick are always fully dispatched first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same request.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests termination. Idempotent; the sole writer of the flag.
    pub fn request(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Reads the flag. Called once per tick boundary by the runtime.
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_visible_to_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_requested());
        token.request();
        assert!(observer.is_requested());
        token.request();
        assert!(observer.is_requested());
    }
}
