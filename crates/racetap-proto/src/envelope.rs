//! Broadcast envelope framing.
//!
//! One published output is three length-prefixed frames in sequence:
//! `[topic]["<seat name>"][payload]`, each prefixed with a u32 LE byte
//! count. The topic is always `"smb"`; subscribers drop envelopes whose
//! seat name they are not watching.

use crate::constants::{BROADCAST_TOPIC, FRAME_LEN_PREFIX, MAX_ENVELOPE_FRAME, MAX_SEAT_NAME};
use crate::error::ProtoError;

/// A decoded envelope borrowing from the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeView<'a> {
    pub topic: &'a [u8],
    pub name: &'a str,
    pub payload: &'a [u8],
}

pub fn encode_envelope(name: &str, payload: &[u8]) -> Result<Vec<u8>, ProtoError> {
    if name.len() > MAX_SEAT_NAME {
        return Err(ProtoError::NameTooLarge(name.len()));
    }
    if payload.len() > MAX_ENVELOPE_FRAME {
        return Err(ProtoError::FrameTooLarge(payload.len()));
    }

    let total = 3 * FRAME_LEN_PREFIX + BROADCAST_TOPIC.len() + name.len() + payload.len();
    let mut out = Vec::with_capacity(total);
    for frame in [BROADCAST_TOPIC, name.as_bytes(), payload] {
        out.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        out.extend_from_slice(frame);
    }
    Ok(out)
}

/// Decode as many whole envelopes as `in_buf` holds.
///
/// Returns the envelopes and the byte count consumed; a trailing partial
/// envelope is left for the next read. Oversized frames are a protocol
/// error, not a short read.
pub fn try_decode_envelopes(in_buf: &[u8]) -> Result<(Vec<EnvelopeView<'_>>, usize), ProtoError> {
    let mut envelopes = Vec::new();
    let mut offset = 0usize;

    'outer: loop {
        let mut cursor = offset;
        let mut frames: [&[u8]; 3] = [&[]; 3];
        for (i, frame) in frames.iter_mut().enumerate() {
            if in_buf.len().saturating_sub(cursor) < FRAME_LEN_PREFIX {
                break 'outer;
            }
            let len_bytes: [u8; 4] = in_buf[cursor..cursor + FRAME_LEN_PREFIX]
                .try_into()
                .expect("slice length is 4");
            let len = u32::from_le_bytes(len_bytes) as usize;

            let limit = if i == 1 { MAX_SEAT_NAME } else { MAX_ENVELOPE_FRAME };
            if len > limit {
                return Err(ProtoError::FrameTooLarge(len));
            }
            cursor += FRAME_LEN_PREFIX;
            if in_buf.len().saturating_sub(cursor) < len {
                break 'outer;
            }
            *frame = &in_buf[cursor..cursor + len];
            cursor += len;
        }

        let name = std::str::from_utf8(frames[1]).map_err(|_| ProtoError::NameNotUtf8)?;
        envelopes.push(EnvelopeView {
            topic: frames[0],
            name,
            payload: frames[2],
        });
        offset = cursor;
    }

    Ok((envelopes, offset))
}
