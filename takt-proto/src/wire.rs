//! Shared envelope header helpers.

use bytes::Buf;
use thiserror::Error;

/// Width of the envelope discriminant in bytes.
pub(crate) const DISCRIMINANT_LEN: usize = 2;

/// Errors from envelope coding, either direction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("unrecognized {family} discriminant {value:#06x}")]
    UnknownDiscriminant { family: &'static str, value: u16 },
    #[error("envelope truncated: needed {needed} more bytes for {field}")]
    Truncated { field: &'static str, needed: usize },
    #[error("{family} envelope of {len} bytes exceeds the {max}-byte wire bound")]
    Oversized {
        family: &'static str,
        len: usize,
        max: usize,
    },
}

/// Decodes the discriminant — always the first, fixed-width field — without
/// touching any variant payload.
pub fn discriminant(buf: &[u8]) -> Result<u16, WireError> {
    if buf.len() < DISCRIMINANT_LEN {
        return Err(WireError::Truncated {
            field: "discriminant",
            needed: DISCRIMINANT_LEN - buf.len(),
        });
    }
    Ok((&buf[..DISCRIMINANT_LEN]).get_u16_le())
}

/// Checks that `buf` still holds `needed` bytes for `field`.
pub(crate) fn ensure(buf: &[u8], needed: usize, field: &'static str) -> Result<(), WireError> {
    if buf.remaining() < needed {
        return Err(WireError::Truncated {
            field,
            needed: needed - buf.remaining(),
        });
    }
    Ok(())
}
