//! The update collaborator seam.

use takt_core::ChunkQueue;

use crate::error::EngineError;

/// Everything the update phase sees for one tick.
pub struct UpdateContext<'a> {
    /// This tick's inbound event chunks; the handler drains them with
    /// `read` and decodes what it cares about.
    pub events: &'a mut ChunkQueue,
    /// The command queue to fill; the runtime dispatches and resets it
    /// after the update phase returns.
    pub commands: &'a mut ChunkQueue,
    /// Arena-backed application memory, stable across ticks.
    pub scratch: &'a mut [u8],
    /// Clearing this ends the run after the current tick's dispatch.
    /// Only the update phase mutates it.
    pub running: &'a mut bool,
}

/// The external update hook invoked once per tick.
///
/// Recoverable application conditions must be modeled as events or
/// commands; an `Err` here is fatal to the process (queue exhaustion,
/// envelope mismatch).
pub trait UpdateHandler {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), EngineError>;
}

impl<F> UpdateHandler for F
where
    F: FnMut(&mut UpdateContext<'_>) -> Result<(), EngineError>,
{
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), EngineError> {
        self(ctx)
    }
}
