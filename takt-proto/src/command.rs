//! Command envelopes: update loop → network collaborator.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::wire::{self, WireError, DISCRIMINANT_LEN};
use crate::ClientId;

const BROADCAST: u16 = 0x0001;
const SHUTDOWN: u16 = 0x0002;

/// Upper bound on one encoded command, for queue provisioning.
pub const MAX_COMMAND_WIRE_LEN: usize = 1024;

/// The closed set of commands the update loop may dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send `message` to every client in `client_ids`.
    ///
    /// Payload: `[u16 count][u16 client-id ...][message bytes]`.
    Broadcast {
        client_ids: Vec<ClientId>,
        message: Bytes,
    },
    /// Stop serving. Empty payload.
    Shutdown,
}

impl Command {
    /// Serializes the command into one envelope.
    ///
    /// Rejects anything past [`MAX_COMMAND_WIRE_LEN`] — queues are
    /// provisioned against that bound, and it also keeps the id count
    /// within the u16 count field.
    pub fn encode(&self) -> Result<Bytes, WireError> {
        match self {
            Self::Broadcast {
                client_ids,
                message,
            } => {
                let len = DISCRIMINANT_LEN + 2 + client_ids.len() * 2 + message.len();
                if len > MAX_COMMAND_WIRE_LEN {
                    return Err(WireError::Oversized {
                        family: "command",
                        len,
                        max: MAX_COMMAND_WIRE_LEN,
                    });
                }
                let mut buf = BytesMut::with_capacity(len);
                buf.put_u16_le(BROADCAST);
                buf.put_u16_le(client_ids.len() as u16);
                for id in client_ids {
                    buf.put_u16_le(*id);
                }
                buf.put_slice(message);
                Ok(buf.freeze())
            }
            Self::Shutdown => {
                let mut buf = BytesMut::with_capacity(DISCRIMINANT_LEN);
                buf.put_u16_le(SHUTDOWN);
                Ok(buf.freeze())
            }
        }
    }

    /// Decodes one envelope. The discriminant is read first; variant fields
    /// are only parsed once it is recognized.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let value = wire::discriminant(buf)?;
        let mut rest = &buf[DISCRIMINANT_LEN..];
        match value {
            BROADCAST => {
                wire::ensure(rest, 2, "client-id count")?;
                let count = rest.get_u16_le() as usize;
                wire::ensure(rest, count * 2, "client-id list")?;
                let mut client_ids = Vec::with_capacity(count);
                for _ in 0..count {
                    client_ids.push(rest.get_u16_le());
                }
                Ok(Self::Broadcast {
                    client_ids,
                    message: Bytes::copy_from_slice(rest),
                })
            }
            SHUTDOWN => Ok(Self::Shutdown),
            value => Err(WireError::UnknownDiscriminant {
                family: "command",
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_roundtrip() {
        let cmd = Command::Broadcast {
            client_ids: vec![7, 42],
            message: Bytes::from_static(b"hello"),
        };
        let encoded = cmd.encode().unwrap();
        // [disc][count=2][7][42]["hello"]
        assert_eq!(&encoded[..], b"\x01\x00\x02\x00\x07\x00\x2a\x00hello");
        assert_eq!(Command::decode(&encoded).unwrap(), cmd);
    }

    #[test]
    fn shutdown_has_empty_payload() {
        let encoded = Command::Shutdown.encode().unwrap();
        assert_eq!(&encoded[..], b"\x02\x00");
        assert_eq!(Command::decode(&encoded).unwrap(), Command::Shutdown);
    }

    #[test]
    fn empty_broadcast_roundtrip() {
        let cmd = Command::Broadcast {
            client_ids: vec![],
            message: Bytes::new(),
        };
        assert_eq!(Command::decode(&cmd.encode().unwrap()).unwrap(), cmd);
    }

    #[test]
    fn broadcast_past_the_wire_bound_is_rejected() {
        // 512 ids alone already exceed the bound; before the check the
        // count field silently truncated instead.
        let cmd = Command::Broadcast {
            client_ids: (0..(MAX_COMMAND_WIRE_LEN / 2) as u16).collect(),
            message: Bytes::new(),
        };
        assert!(matches!(
            cmd.encode().unwrap_err(),
            WireError::Oversized { family: "command", .. }
        ));
    }

    #[test]
    fn unknown_discriminant_is_an_error() {
        let err = Command::decode(b"\xff\x00").unwrap_err();
        assert_eq!(
            err,
            WireError::UnknownDiscriminant {
                family: "command",
                value: 0x00ff
            }
        );
    }

    #[test]
    fn truncated_envelopes_are_errors() {
        assert!(matches!(
            Command::decode(b"\x01"),
            Err(WireError::Truncated { .. })
        ));
        // Count says two ids but only one follows.
        assert!(matches!(
            Command::decode(b"\x01\x00\x02\x00\x07\x00"),
            Err(WireError::Truncated { .. })
        ));
    }
}
