//! Reference update collaborator: a chat-style relay.
//!
//! Keeps the roster of connected clients and fans each inbound message out
//! to every other client. Small on purpose — application logic is outside
//! the runtime core, and this is the smallest application that exercises
//! every envelope variant.

use tracing::{debug, info};

use takt_engine::{EngineError, UpdateContext, UpdateHandler};
use takt_proto::{ClientId, Command, Event};

#[derive(Default)]
pub struct RelayHandler {
    clients: Vec<ClientId>,
}

impl RelayHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateHandler for RelayHandler {
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), EngineError> {
        while let Some(chunk) = ctx.events.read() {
            match Event::decode(chunk)? {
                Event::ClientConnected { client } => {
                    info!(client, "client joined");
                    self.clients.push(client);
                }
                Event::ClientDisconnected { client } => {
                    info!(client, "client left");
                    self.clients.retain(|c| *c != client);
                }
                Event::Message { client, payload } => {
                    let peers: Vec<ClientId> = self
                        .clients
                        .iter()
                        .copied()
                        .filter(|peer| *peer != client)
                        .collect();
                    debug!(client, peers = peers.len(), "relaying message");
                    if !peers.is_empty() {
                        let cmd = Command::Broadcast {
                            client_ids: peers,
                            message: payload,
                        };
                        ctx.commands.write(&cmd.encode()?)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use takt_core::{Arena, ChunkQueue};

    fn tick(
        handler: &mut RelayHandler,
        events: Vec<Event>,
    ) -> Result<Vec<Command>, EngineError> {
        let mut arena = Arena::with_capacity(64 * 1024).unwrap();
        let mut event_queue = ChunkQueue::bind(arena.allocate(16 * 1024).unwrap());
        let mut command_queue = ChunkQueue::bind(arena.allocate(16 * 1024).unwrap());
        let mut scratch = arena.allocate(1024).unwrap();
        for event in events {
            event_queue.write(&event.encode()).unwrap();
        }

        let mut running = true;
        let mut ctx = UpdateContext {
            events: &mut event_queue,
            commands: &mut command_queue,
            scratch: scratch.as_mut_slice(),
            running: &mut running,
        };
        handler.update(&mut ctx)?;

        let mut commands = Vec::new();
        while let Some(chunk) = command_queue.read() {
            commands.push(Command::decode(chunk)?);
        }
        Ok(commands)
    }

    #[test]
    fn relays_to_everyone_but_the_sender() {
        let mut handler = RelayHandler::new();
        let commands = tick(
            &mut handler,
            vec![
                Event::ClientConnected { client: 1 },
                Event::ClientConnected { client: 2 },
                Event::ClientConnected { client: 3 },
                Event::Message {
                    client: 2,
                    payload: Bytes::from_static(b"hi"),
                },
            ],
        )
        .unwrap();

        assert_eq!(
            commands,
            vec![Command::Broadcast {
                client_ids: vec![1, 3],
                message: Bytes::from_static(b"hi"),
            }]
        );
    }

    #[test]
    fn lone_client_produces_no_commands() {
        let mut handler = RelayHandler::new();
        let commands = tick(
            &mut handler,
            vec![
                Event::ClientConnected { client: 1 },
                Event::Message {
                    client: 1,
                    payload: Bytes::from_static(b"echo?"),
                },
            ],
        )
        .unwrap();
        assert!(commands.is_empty());
    }

    #[test]
    fn departed_clients_stop_receiving() {
        let mut handler = RelayHandler::new();
        tick(
            &mut handler,
            vec![
                Event::ClientConnected { client: 1 },
                Event::ClientConnected { client: 2 },
            ],
        )
        .unwrap();

        let commands = tick(
            &mut handler,
            vec![
                Event::ClientDisconnected { client: 2 },
                Event::Message {
                    client: 1,
                    payload: Bytes::from_static(b"anyone?"),
                },
            ],
        )
        .unwrap();
        assert!(commands.is_empty());
    }
}
