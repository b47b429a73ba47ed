//! Channel-backed handle/runner pair.
//!
//! The original design shared one network context across both threads with
//! no synchronization visible at the boundary; here the boundary *is* the
//! synchronization: a bounded event channel inbound and a bounded op
//! channel outbound, nothing else shared.

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use takt_proto::ClientId;

use crate::service::NetworkService;

/// Operations the tick loop pushes to the network thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetOp {
    Broadcast {
        client_ids: Vec<ClientId>,
        message: Bytes,
    },
    Stop,
}

/// The runner's ends of the channel pair.
pub struct RunnerChannels {
    pub ops: Receiver<NetOp>,
    pub events: Sender<Bytes>,
}

/// The tick loop's end of the channel pair. Implements [`NetworkService`].
pub struct NetworkHandle {
    events: Receiver<Bytes>,
    ops: Sender<NetOp>,
    stop_sent: bool,
}

/// Creates a connected handle/runner pair with the given channel capacity.
pub fn channel(capacity: usize) -> (NetworkHandle, RunnerChannels) {
    let (event_tx, event_rx) = bounded(capacity);
    let (op_tx, op_rx) = bounded(capacity);
    (
        NetworkHandle {
            events: event_rx,
            ops: op_tx,
            stop_sent: false,
        },
        RunnerChannels {
            ops: op_rx,
            events: event_tx,
        },
    )
}

impl NetworkHandle {
    fn push_op(&self, op: NetOp) {
        match self.ops.try_send(op) {
            Ok(()) => {}
            Err(TrySendError::Full(op)) => {
                // Outbound volume beyond the channel is a provisioning
                // problem on the network side, not a tick-loop fault.
                warn!(?op, "network op channel full, dropping op");
            }
            Err(TrySendError::Disconnected(op)) => {
                warn!(?op, "network thread gone, dropping op");
            }
        }
    }
}

impl NetworkService for NetworkHandle {
    fn poll_event(&mut self) -> Option<Bytes> {
        self.events.try_recv().ok()
    }

    fn broadcast(&mut self, client_ids: &[ClientId], message: &[u8]) {
        self.push_op(NetOp::Broadcast {
            client_ids: client_ids.to_vec(),
            message: Bytes::copy_from_slice(message),
        });
    }

    fn stop(&mut self) {
        if self.stop_sent {
            return;
        }
        // Unlike a broadcast, stop must not be lost: the runner exits its
        // loop only on seeing it, and teardown joins the runner thread.
        // The runner drains ops every pass, so this blocks at most briefly.
        if self.ops.send(NetOp::Stop).is_err() {
            warn!("network thread gone before stop");
        }
        self.stop_sent = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn poll_event_is_non_blocking() {
        let (mut handle, runner) = channel(8);
        assert_eq!(handle.poll_event(), None);

        runner.events.send(Bytes::from_static(b"ev")).unwrap();
        assert_eq!(handle.poll_event(), Some(Bytes::from_static(b"ev")));
        assert_eq!(handle.poll_event(), None);
    }

    #[test]
    fn broadcast_forwards_ids_and_message() {
        let (mut handle, runner) = channel(8);
        handle.broadcast(&[7, 42], b"hello");
        assert_eq!(
            runner.ops.try_recv().unwrap(),
            NetOp::Broadcast {
                client_ids: vec![7, 42],
                message: Bytes::from_static(b"hello"),
            }
        );
    }

    #[test]
    fn stop_is_sent_exactly_once() {
        let (mut handle, runner) = channel(8);
        handle.stop();
        handle.stop();
        assert_eq!(runner.ops.try_recv().unwrap(), NetOp::Stop);
        assert!(runner.ops.try_recv().is_err());
    }

    #[test]
    fn stop_waits_out_a_full_op_channel() {
        let (mut handle, runner) = channel(1);
        handle.broadcast(&[1], b"a"); // fills the channel
        let drainer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut ops = Vec::new();
            while let Ok(op) = runner.ops.recv_timeout(Duration::from_secs(5)) {
                let done = op == NetOp::Stop;
                ops.push(op);
                if done {
                    break;
                }
            }
            ops
        });

        handle.stop();
        handle.stop();
        let ops = drainer.join().unwrap();
        assert_eq!(ops.iter().filter(|op| **op == NetOp::Stop).count(), 1);
        assert_eq!(ops.last(), Some(&NetOp::Stop));
    }

    #[test]
    fn full_op_channel_drops_instead_of_blocking() {
        let (mut handle, runner) = channel(1);
        handle.broadcast(&[1], b"a");
        handle.broadcast(&[2], b"b"); // dropped, must not block
        assert!(matches!(
            runner.ops.try_recv().unwrap(),
            NetOp::Broadcast { client_ids, .. } if client_ids == vec![1]
        ));
        assert!(runner.ops.try_recv().is_err());
    }
}
