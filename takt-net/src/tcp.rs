//! Non-blocking TCP runner for the network thread.
//!
//! Wire format toward clients mirrors the chunk framing: `[u32 LE length]
//! [payload]`. The runner polls the listener, the client sockets, and the
//! op channel once per pass, then sleeps briefly; it exits its loop when a
//! `Stop` op arrives so the tick loop's join returns.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{SendTimeoutError, TrySendError};
use tracing::{debug, info, trace, warn};

use takt_proto::{ClientId, Event, MAX_EVENT_WIRE_LEN};

use crate::channel::{NetOp, RunnerChannels};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long a lifecycle event may wait for event-channel room. A live tick
/// loop drains every millisecond; only a tick loop already in teardown can
/// let this expire.
const LIFECYCLE_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Frame length prefix width on the client wire.
const FRAME_HEADER_LEN: usize = 4;

/// Network runner configuration.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Local TCP bind address.
    pub listen: SocketAddr,
    /// Largest client frame accepted; bigger frames drop the client.
    pub max_frame_len: usize,
    /// Connections served at once; further connects are refused.
    pub max_clients: usize,
    /// Capacity of the event and op channels.
    pub channel_capacity: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:4271".parse().expect("static addr"),
            // Leave envelope headroom below the event queue's chunk bound.
            max_frame_len: MAX_EVENT_WIRE_LEN - 8,
            max_clients: 64,
            channel_capacity: 256,
        }
    }
}

struct Client {
    id: ClientId,
    stream: TcpStream,
    inbox: Vec<u8>,
    outbox: Vec<u8>,
    dead: bool,
}

/// Owns the listener and all client sockets; lives entirely on the
/// network thread.
pub struct TcpRunner {
    listener: TcpListener,
    config: NetConfig,
    channels: RunnerChannels,
    clients: Vec<Client>,
    next_id: ClientId,
}

impl TcpRunner {
    pub fn new(listener: TcpListener, config: NetConfig, channels: RunnerChannels) -> Self {
        Self {
            listener,
            config,
            channels,
            clients: Vec::new(),
            next_id: 1,
        }
    }

    /// Thread entry point. Returns once a `Stop` op has been observed.
    pub fn run(mut self) {
        info!(listen = %self.config.listen, "network thread serving");
        loop {
            if self.drain_ops() {
                break;
            }
            self.accept_pending();
            self.pump_clients();
            self.reap_dead();
            thread::sleep(POLL_INTERVAL);
        }
        info!("network thread stopped");
    }

    /// Services queued ops. Returns true when `Stop` was seen.
    fn drain_ops(&mut self) -> bool {
        while let Ok(op) = self.channels.ops.try_recv() {
            match op {
                NetOp::Broadcast {
                    client_ids,
                    message,
                } => {
                    let framed = frame(&message);
                    for client in self
                        .clients
                        .iter_mut()
                        .filter(|c| client_ids.contains(&c.id))
                    {
                        client.outbox.extend_from_slice(&framed);
                    }
                }
                NetOp::Stop => return true,
            }
        }
        false
    }

    fn accept_pending(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if self.clients.len() >= self.config.max_clients {
                        // Closing the stream is the refusal.
                        warn!(%peer, "client limit reached, refusing connection");
                        continue;
                    }
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!(%peer, error = %e, "rejecting client, nonblocking setup failed");
                        continue;
                    }
                    let used: Vec<ClientId> = self.clients.iter().map(|c| c.id).collect();
                    let (id, next) = next_free_id(self.next_id, &used);
                    self.next_id = next;
                    debug!(%peer, client = id, "client connected");
                    self.clients.push(Client {
                        id,
                        stream,
                        inbox: Vec::new(),
                        outbox: Vec::new(),
                        dead: false,
                    });
                    self.emit(Event::ClientConnected { client: id });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    fn pump_clients(&mut self) {
        let max_frame = self.config.max_frame_len;
        let mut inbound = Vec::new();
        for client in &mut self.clients {
            read_into_inbox(client);
            loop {
                match take_frame(&mut client.inbox, max_frame) {
                    Ok(Some(payload)) => inbound.push((client.id, payload)),
                    Ok(None) => break,
                    Err(len) => {
                        // Oversized frame: protocol abuse, drop the client.
                        warn!(client = client.id, len, "frame exceeds limit, dropping client");
                        client.dead = true;
                        break;
                    }
                }
            }
            flush_outbox(client);
        }
        for (client, payload) in inbound {
            trace!(client, bytes = payload.len(), "inbound frame");
            self.emit(Event::Message {
                client,
                payload: payload.into(),
            });
        }
    }

    fn reap_dead(&mut self) {
        let mut departed = Vec::new();
        self.clients.retain(|c| {
            if c.dead {
                departed.push(c.id);
            }
            !c.dead
        });
        for client in departed {
            debug!(client, "client disconnected");
            self.emit(Event::ClientDisconnected { client });
        }
    }

    fn emit(&self, event: Event) {
        let encoded = event.encode();
        match event {
            // A dropped message inconveniences one client; a dropped
            // lifecycle event permanently desyncs any roster the update
            // handler keeps. Lifecycle events wait for room, bounded so a
            // tick loop mid-teardown cannot wedge this thread.
            Event::ClientConnected { .. } | Event::ClientDisconnected { .. } => {
                match self
                    .channels
                    .events
                    .send_timeout(encoded, LIFECYCLE_SEND_TIMEOUT)
                {
                    Ok(()) => {}
                    Err(SendTimeoutError::Timeout(_)) => {
                        warn!("event channel stalled, lifecycle event lost");
                    }
                    Err(SendTimeoutError::Disconnected(_)) => {}
                }
            }
            Event::Message { .. } => match self.channels.events.try_send(encoded) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("event channel full, dropping message event");
                }
                Err(TrySendError::Disconnected(_)) => {
                    // Tick loop gone; the Stop op will arrive or the process
                    // is already tearing down.
                }
            },
        }
    }
}

fn read_into_inbox(client: &mut Client) {
    let mut buf = [0u8; 1024];
    loop {
        match client.stream.read(&mut buf) {
            Ok(0) => {
                client.dead = true;
                break;
            }
            Ok(n) => client.inbox.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(client = client.id, error = %e, "read failed");
                client.dead = true;
                break;
            }
        }
    }
}

fn flush_outbox(client: &mut Client) {
    while !client.outbox.is_empty() {
        match client.stream.write(&client.outbox) {
            Ok(0) => {
                client.dead = true;
                break;
            }
            Ok(n) => {
                client.outbox.drain(..n);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(client = client.id, error = %e, "write failed");
                client.dead = true;
                break;
            }
        }
    }
}

/// Picks the first id not in `used`, counting up from `next`; returns the
/// id and the successor to count from next time.
///
/// Ids wrap at `u16::MAX` and restart at 1, so a long-lived process can
/// land the counter on a client that is still connected. The client cap
/// keeps `used` strictly smaller than the id space, so the scan terminates.
fn next_free_id(mut next: ClientId, used: &[ClientId]) -> (ClientId, ClientId) {
    loop {
        let id = next;
        next = next.wrapping_add(1).max(1);
        if !used.contains(&id) {
            return (id, next);
        }
    }
}

/// Prepends the u32 LE length prefix.
fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(payload);
    framed
}

/// Extracts one complete frame from `buf` if present.
///
/// `Ok(None)` means more bytes are needed; `Err(len)` reports an oversized
/// frame announcement.
fn take_frame(buf: &mut Vec<u8>, max_frame_len: usize) -> Result<Option<Vec<u8>>, usize> {
    if buf.len() < FRAME_HEADER_LEN {
        return Ok(None);
    }
    let mut prefix = [0u8; FRAME_HEADER_LEN];
    prefix.copy_from_slice(&buf[..FRAME_HEADER_LEN]);
    let len = u32::from_le_bytes(prefix) as usize;
    if len > max_frame_len {
        return Err(len);
    }
    if buf.len() < FRAME_HEADER_LEN + len {
        return Ok(None);
    }
    let payload = buf[FRAME_HEADER_LEN..FRAME_HEADER_LEN + len].to_vec();
    buf.drain(..FRAME_HEADER_LEN + len);
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::channel;
    use crate::service::NetworkService;
    use std::time::Instant;

    #[test]
    fn take_frame_handles_partials_and_batches() {
        let mut buf = Vec::new();
        assert_eq!(take_frame(&mut buf, 64), Ok(None));

        buf.extend_from_slice(&frame(b"one"));
        buf.extend_from_slice(&frame(b"two"));
        buf.extend_from_slice(&3u32.to_le_bytes()); // announced but incomplete

        assert_eq!(take_frame(&mut buf, 64), Ok(Some(b"one".to_vec())));
        assert_eq!(take_frame(&mut buf, 64), Ok(Some(b"two".to_vec())));
        assert_eq!(take_frame(&mut buf, 64), Ok(None));

        buf.extend_from_slice(b"thr");
        assert_eq!(take_frame(&mut buf, 64), Ok(Some(b"thr".to_vec())));
        assert!(buf.is_empty());
    }

    #[test]
    fn wrapped_ids_skip_clients_still_connected() {
        let (id, next) = next_free_id(u16::MAX, &[1, 2]);
        assert_eq!(id, u16::MAX);
        assert_eq!(next, 1); // wrapped past zero

        let (id, next) = next_free_id(next, &[1, 2]);
        assert_eq!(id, 3);
        assert_eq!(next, 4);
    }

    #[test]
    fn take_frame_rejects_oversized_announcements() {
        let mut buf = frame(&vec![0u8; 65]);
        assert_eq!(take_frame(&mut buf, 64), Err(65));
    }

    fn wait_event(handle: &mut crate::NetworkHandle, deadline: Instant) -> Event {
        loop {
            if let Some(chunk) = handle.poll_event() {
                return Event::decode(&chunk).unwrap();
            }
            assert!(Instant::now() < deadline, "timed out waiting for event");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn loopback_connect_message_broadcast_stop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let config = NetConfig {
            listen: addr,
            ..NetConfig::default()
        };
        let (mut handle, channels) = channel(config.channel_capacity);
        let runner = TcpRunner::new(listener, config, channels);
        let thread = thread::spawn(move || runner.run());

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut socket = TcpStream::connect(addr).unwrap();
        let client = match wait_event(&mut handle, deadline) {
            Event::ClientConnected { client } => client,
            other => panic!("expected connect event, got {other:?}"),
        };

        socket.write_all(&frame(b"ping")).unwrap();
        match wait_event(&mut handle, deadline) {
            Event::Message {
                client: from,
                payload,
            } => {
                assert_eq!(from, client);
                assert_eq!(&payload[..], b"ping");
            }
            other => panic!("expected message event, got {other:?}"),
        }

        handle.broadcast(&[client], b"pong");
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut reply = [0u8; 8];
        socket.read_exact(&mut reply).unwrap();
        assert_eq!(&reply[..4], &4u32.to_le_bytes());
        assert_eq!(&reply[4..], b"pong");

        handle.stop();
        thread.join().unwrap();
    }

    #[test]
    fn lifecycle_events_survive_a_full_event_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let config = NetConfig {
            listen: addr,
            channel_capacity: 1,
            ..NetConfig::default()
        };
        let (mut handle, channels) = channel(config.channel_capacity);
        let runner = TcpRunner::new(listener, config, channels);
        let thread = thread::spawn(move || runner.run());

        // The first connect event fills the one-slot channel; the second
        // must wait for us to poll rather than vanish.
        let _a = TcpStream::connect(addr).unwrap();
        let _b = TcpStream::connect(addr).unwrap();
        thread::sleep(Duration::from_millis(50));

        let deadline = Instant::now() + Duration::from_secs(5);
        assert!(matches!(
            wait_event(&mut handle, deadline),
            Event::ClientConnected { .. }
        ));
        assert!(matches!(
            wait_event(&mut handle, deadline),
            Event::ClientConnected { .. }
        ));

        handle.stop();
        thread.join().unwrap();
    }

    #[test]
    fn connections_past_the_client_limit_are_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        let config = NetConfig {
            listen: addr,
            max_clients: 1,
            ..NetConfig::default()
        };
        let (mut handle, channels) = channel(config.channel_capacity);
        let runner = TcpRunner::new(listener, config, channels);
        let thread = thread::spawn(move || runner.run());

        let deadline = Instant::now() + Duration::from_secs(5);
        let _first = TcpStream::connect(addr).unwrap();
        assert!(matches!(
            wait_event(&mut handle, deadline),
            Event::ClientConnected { .. }
        ));

        // The second connect is accepted by the OS but closed by the runner
        // without ever becoming a client.
        let mut second = TcpStream::connect(addr).unwrap();
        second
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(second.read(&mut buf).unwrap(), 0);
        assert_eq!(handle.poll_event(), None);

        handle.stop();
        thread.join().unwrap();
    }
}
