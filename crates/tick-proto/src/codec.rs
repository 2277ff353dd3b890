//! Tick encoder and decoder.
//!
//! Uses bytemuck to move between the packed wire struct and raw bytes.

use bytemuck::{bytes_of, pod_read_unaligned};
use thiserror::Error;

use crate::messages::*;

/// Decode failures.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer is not exactly one tick long.
    #[error("malformed packet: expected 14 bytes, got {len}")]
    MalformedPacket { len: usize },
    /// Instrument type byte outside {0,1,2}.
    #[error("invalid instrument type: {0}")]
    InvalidInstrumentType(u8),
    /// Side byte outside {0,1}.
    #[error("invalid side: {0}")]
    InvalidSide(u8),
}

/// Encode a tick into its 14-byte wire form.
#[inline(always)]
pub fn encode(record: &TickRecord) -> [u8; TICK_SIZE] {
    let mut out = [0u8; TICK_SIZE];
    out.copy_from_slice(bytes_of(&TickWire::from_record(record)));
    out
}

/// Encode a tick into the front of `buffer`, returning the bytes written.
///
/// `buffer` must hold at least [`TICK_SIZE`] bytes.
#[inline(always)]
pub fn encode_into(record: &TickRecord, buffer: &mut [u8]) -> usize {
    debug_assert!(buffer.len() >= TICK_SIZE);
    buffer[..TICK_SIZE].copy_from_slice(bytes_of(&TickWire::from_record(record)));
    TICK_SIZE
}

/// Decode exactly one tick.
///
/// Anything other than a 14-byte buffer is a [`CodecError::MalformedPacket`];
/// one datagram carries one tick, so trailing bytes are not tolerated.
#[inline]
pub fn decode(buffer: &[u8]) -> Result<TickRecord, CodecError> {
    if buffer.len() != TICK_SIZE {
        return Err(CodecError::MalformedPacket { len: buffer.len() });
    }

    let wire: TickWire = pod_read_unaligned(buffer);
    wire.to_record()
}
