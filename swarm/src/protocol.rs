//! The fixed layout of a range-and-bearing broadcast packet.
//!
//! ```text
//! | initiator: u8 | responder: u8 | range: f32 | confidence: f32 | ... one pair per table slot ... | zero padding |
//! ```
//!
//! Floats are little-endian IEEE-754. Entries are always written for the full table in slot
//! order and the packet is padded with zeros up to the bandwidth of the medium. There is no length
//! prefix; the receiver knows the swarm size from its own configuration.

use bincode::{
    config::{self, Config},
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use thiserror::Error;

use crate::{
    peer::PeerId,
    table::{Confidence, DistanceEntry},
};

pub const HEADER_LEN: usize = 2;
pub const ENTRY_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("packet of {len} bytes is shorter than the header")]
    Truncated { len: usize },

    #[error("packet needs {required} bytes but the bandwidth is {capacity} bytes")]
    CapacityExceeded { required: usize, capacity: usize },

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

fn wire_config() -> impl Config {
    config::standard().with_little_endian().with_fixed_int_encoding()
}

/// The two ID bytes leading every packet.
///
/// A packet stands in for the acknowledgement a responder sends back to the initiator of a
/// ranging exchange, so the robot that actually transmitted it is the `responder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub initiator: PeerId,
    pub responder: PeerId,
}

#[derive(Encode, Decode)]
struct WireHeader {
    initiator: u8,
    responder: u8,
}

#[derive(Encode, Decode)]
struct WireEntry {
    range: f32,
    confidence: f32,
}

impl Header {
    /// The header of a robot announcing its own table to everyone in range.
    pub fn broadcast_from(responder: PeerId) -> Self {
        Self {
            initiator: PeerId::BROADCAST,
            responder,
        }
    }

    /// Either ID being null marks a packet that carries nothing.
    pub fn is_null(&self) -> bool {
        self.initiator.is_null() || self.responder.is_null()
    }
}

impl From<&DistanceEntry> for WireEntry {
    fn from(e: &DistanceEntry) -> Self {
        Self {
            range: e.range,
            confidence: e.confidence.value(),
        }
    }
}

impl From<WireEntry> for DistanceEntry {
    fn from(e: WireEntry) -> Self {
        DistanceEntry::new(e.range, Confidence::new_unchecked(e.confidence))
    }
}

/// Length of a packet carrying `entries` table slots, before padding.
pub fn natural_len(entries: usize) -> usize {
    HEADER_LEN + entries * ENTRY_LEN
}

/// Serializes the header and the full table, padded with zeros to exactly `capacity` bytes.
/// A table that does not fit is rejected rather than cut short.
pub fn encode(
    header: Header,
    entries: &[DistanceEntry],
    capacity: usize,
) -> Result<Vec<u8>, CodecError> {
    let required = natural_len(entries.len());
    if required > capacity {
        return Err(CodecError::CapacityExceeded { required, capacity });
    }

    let mut buffer = vec![0u8; capacity];
    let wire = WireHeader {
        initiator: header.initiator.byte(),
        responder: header.responder.byte(),
    };
    let mut offset = bincode::encode_into_slice(wire, &mut buffer, wire_config())?;

    for e in entries {
        offset += bincode::encode_into_slice(
            WireEntry::from(e),
            &mut buffer[offset..],
            wire_config(),
        )?;
    }

    Ok(buffer)
}

/// Reads the two ID bytes and returns them together with the remaining payload.
pub fn decode_header(data: &[u8]) -> Result<(Header, &[u8]), CodecError> {
    if data.len() < HEADER_LEN {
        return Err(CodecError::Truncated { len: data.len() });
    }

    let (wire, read): (WireHeader, usize) =
        bincode::decode_from_slice(&data[..HEADER_LEN], wire_config())?;

    let header = Header {
        initiator: PeerId::from_byte(wire.initiator),
        responder: PeerId::from_byte(wire.responder),
    };

    Ok((header, &data[read..]))
}

/// Reads up to `count` entries from a payload in slot order, stopping early at the end of the
/// provided bytes. A trailing partial entry is ignored.
pub fn decode_entries(payload: &[u8], count: usize) -> impl Iterator<Item = DistanceEntry> + '_ {
    payload
        .chunks_exact(ENTRY_LEN)
        .take(count)
        .filter_map(|chunk| {
            bincode::decode_from_slice::<WireEntry, _>(chunk, wire_config())
                .ok()
                .map(|(e, _)| e.into())
        })
}

/// A fully decoded packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub header: Header,
    pub entries: Vec<DistanceEntry>,
}

impl Packet {
    pub fn decode(data: &[u8], count: usize) -> Result<Self, CodecError> {
        let (header, payload) = decode_header(data)?;
        Ok(Self {
            header,
            entries: decode_entries(payload, count).collect(),
        })
    }

    pub fn encode(&self, capacity: usize) -> Result<Vec<u8>, CodecError> {
        encode(self.header, &self.entries, capacity)
    }
}
