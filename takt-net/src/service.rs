//! The seam between the tick loop and the network collaborator.

use bytes::Bytes;
use takt_proto::ClientId;

/// What the tick loop asks of the network collaborator.
///
/// Contract: `poll_event` is strictly non-blocking — it returns `None` the
/// moment nothing is pending. `stop` is idempotent: implementations deliver
/// at most one stop signal no matter how often it is called. Network-level
/// failures (disconnects, malformed client input) must be surfaced as
/// well-formed events or swallowed with a log line, never as faults
/// crossing this seam.
pub trait NetworkService {
    /// Pulls the next available inbound event chunk, if any.
    fn poll_event(&mut self) -> Option<Bytes>;

    /// Sends `message` to each client in `client_ids`.
    fn broadcast(&mut self, client_ids: &[ClientId], message: &[u8]);

    /// Signals the collaborator to stop serving.
    fn stop(&mut self);
}
