//! Wire format for node-to-node messages.
//!
//! Envelopes are serialised with postcard. Stream transports wrap each
//! envelope in a frame: a little-endian u32 length followed by the body.

use std::io::{ErrorKind, Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};
use crate::result::PartialResult;

/// Largest encoded envelope any transport carries
pub const MAX_FRAME_LEN: usize = 1 << 30;

/// Kind of message, checked by the receiver before the payload is used
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tag {
    /// First frame on a stream connection, names the sender
    Handshake,
    /// A node's local result
    Result,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    Hello,
    /// Local count only
    Count(u64),
    /// Local primes, ascending within the node
    ///
    /// Bounded by `MAX_FRAME_LEN` once encoded, which caps enumeration at
    /// roughly 2×10⁸ primes per node on every transport.
    Primes(Vec<u64>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub tag: Tag,
    /// Rank of the sending node
    pub source: usize,
    pub payload: Payload,
}

impl Envelope {
    pub fn hello(source: usize) -> Self {
        Self {
            tag: Tag::Handshake,
            source,
            payload: Payload::Hello,
        }
    }

    /// Wrap a node's local result; the list is shipped only when present
    pub fn result(source: usize, partial: PartialResult) -> Self {
        let payload = match partial.primes {
            Some(primes) => Payload::Primes(primes),
            None => Payload::Count(partial.count),
        };
        Self {
            tag: Tag::Result,
            source,
            payload,
        }
    }

    /// Back to a mergeable result; `None` for payloads that carry no result
    pub fn into_partial(self) -> Option<PartialResult> {
        match self.payload {
            Payload::Count(count) => Some(PartialResult::counted(count)),
            Payload::Primes(primes) => Some(PartialResult::enumerated(primes)),
            Payload::Hello => None,
        }
    }
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    postcard::to_stdvec(envelope).map_err(SieveError::Encode)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    postcard::from_bytes(bytes).map_err(SieveError::Decode)
}

pub fn check_frame_len(len: usize) -> Result<()> {
    if len > MAX_FRAME_LEN {
        return Err(SieveError::FrameTooLarge {
            len,
            max: MAX_FRAME_LEN,
        });
    }
    Ok(())
}

/// Encode and enforce `MAX_FRAME_LEN`
pub fn encode_frame(envelope: &Envelope) -> Result<Vec<u8>> {
    let body = encode(envelope)?;
    check_frame_len(body.len())?;
    Ok(body)
}

pub fn write_frame<W: Write>(writer: &mut W, envelope: &Envelope) -> Result<()> {
    let body = encode_frame(envelope)?;

    writer.write_all(&(body.len() as u32).to_le_bytes())?;
    writer.write_all(&body)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame; a clean end of stream before the length is `Ok(None)`
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Envelope>> {
    let mut len_buf = [0_u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    check_frame_len(len)?;

    let mut body = vec![0_u8; len];
    reader.read_exact(&mut body)?;
    decode(&body).map(Some)
}
