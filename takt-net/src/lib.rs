//! # takt-net
//!
//! The network collaborator side of the runtime. The tick loop depends only
//! on the [`NetworkService`] trait; the concrete implementation here is a
//! handle/runner pair joined by bounded channels, with the runner driving
//! non-blocking TCP on its own dedicated thread.
//!
//! Nothing is shared between the two threads except the channel endpoints,
//! so the tick loop never touches socket state and the network thread never
//! touches the queues or the arena.

pub mod channel;
pub mod service;
pub mod tcp;

use std::io;
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

pub use channel::{channel, NetOp, NetworkHandle, RunnerChannels};
pub use service::NetworkService;
pub use tcp::{NetConfig, TcpRunner};

/// Binds the listener, wires the channel pair, and spawns the network
/// thread. OS-level spawn or bind failure is fatal at the call site.
pub fn spawn(config: NetConfig) -> io::Result<(NetworkHandle, JoinHandle<()>)> {
    let listener = TcpListener::bind(config.listen)?;
    listener.set_nonblocking(true)?;

    let (handle, channels) = channel(config.channel_capacity);
    let thread = thread::Builder::new()
        .name("takt-net".into())
        .spawn(move || TcpRunner::new(listener, config, channels).run())?;
    Ok((handle, thread))
}
