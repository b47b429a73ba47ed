//! Event envelopes: network collaborator → update loop.
//!
//! The tick loop moves these as opaque chunks; decoding happens in the
//! update handler.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::wire::{self, WireError, DISCRIMINANT_LEN};
use crate::ClientId;

const CLIENT_CONNECTED: u16 = 0x0001;
const CLIENT_DISCONNECTED: u16 = 0x0002;
const MESSAGE: u16 = 0x0003;

/// Upper bound on one encoded event, for queue provisioning. Also bounds
/// the frame size the network runner will accept from a client.
pub const MAX_EVENT_WIRE_LEN: usize = 512;

/// The closed set of events the network runner reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A client finished connecting and was assigned an id.
    ClientConnected { client: ClientId },
    /// A client disconnected or was dropped.
    ClientDisconnected { client: ClientId },
    /// A client sent one framed message.
    Message { client: ClientId, payload: Bytes },
}

impl Event {
    /// Serializes the event into one envelope.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(DISCRIMINANT_LEN + 2);
        match self {
            Self::ClientConnected { client } => {
                buf.put_u16_le(CLIENT_CONNECTED);
                buf.put_u16_le(*client);
            }
            Self::ClientDisconnected { client } => {
                buf.put_u16_le(CLIENT_DISCONNECTED);
                buf.put_u16_le(*client);
            }
            Self::Message { client, payload } => {
                buf.reserve(payload.len());
                buf.put_u16_le(MESSAGE);
                buf.put_u16_le(*client);
                buf.put_slice(payload);
            }
        }
        buf.freeze()
    }

    /// Decodes one envelope.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let value = wire::discriminant(buf)?;
        let mut rest = &buf[DISCRIMINANT_LEN..];
        match value {
            CLIENT_CONNECTED | CLIENT_DISCONNECTED | MESSAGE => {
                wire::ensure(rest, 2, "client id")?;
                let client = rest.get_u16_le();
                Ok(match value {
                    CLIENT_CONNECTED => Self::ClientConnected { client },
                    CLIENT_DISCONNECTED => Self::ClientDisconnected { client },
                    _ => Self::Message {
                        client,
                        payload: Bytes::copy_from_slice(rest),
                    },
                })
            }
            value => Err(WireError::UnknownDiscriminant {
                family: "event",
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discriminant;

    #[test]
    fn lifecycle_events_roundtrip() {
        for event in [
            Event::ClientConnected { client: 3 },
            Event::ClientDisconnected { client: 3 },
        ] {
            assert_eq!(Event::decode(&event.encode()).unwrap(), event);
        }
    }

    #[test]
    fn message_roundtrip() {
        let event = Event::Message {
            client: 9,
            payload: Bytes::from_static(b"ping"),
        };
        let encoded = event.encode();
        assert_eq!(&encoded[..], b"\x03\x00\x09\x00ping");
        assert_eq!(Event::decode(&encoded).unwrap(), event);
    }

    #[test]
    fn discriminant_peek_matches_decode() {
        let encoded = Event::ClientConnected { client: 1 }.encode();
        assert_eq!(discriminant(&encoded).unwrap(), 0x0001);
    }

    #[test]
    fn unknown_discriminant_is_an_error() {
        assert_eq!(
            Event::decode(b"\x09\x00\x01\x00").unwrap_err(),
            WireError::UnknownDiscriminant {
                family: "event",
                value: 9
            }
        );
    }
}
