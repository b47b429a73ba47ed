use thiserror::Error;

use takt_core::{ArenaError, QueueError};
use takt_proto::WireError;

/// Fatal runtime conditions. There is no degraded mode: any of these
/// terminates the process after a diagnostic.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Arena capacity exceeded while carving the startup buffers —
    /// a static provisioning defect.
    #[error("memory provisioning failed: {0}")]
    Memory(#[from] ArenaError),

    /// Chunk queue capacity exceeded during a tick.
    #[error("queue provisioning failed: {0}")]
    Queue(#[from] QueueError),

    /// Producer/consumer envelope mismatch; never expected in correct
    /// operation.
    #[error("protocol violation: {0}")]
    Protocol(#[from] WireError),

    /// The network thread panicked before it could be joined.
    #[error("network thread panicked")]
    NetworkThreadPanicked,
}
