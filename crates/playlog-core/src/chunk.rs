//! Tag/length/value chunk codec used by Serato containers.
//!
//! Each chunk is a 4-byte ASCII tag, a big-endian `u32` length and that many
//! payload bytes. Payloads may themselves be chunk sequences.

use thiserror::Error;

const HEADER_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("chunk payload of {0} bytes exceeds the 4-byte length field")]
    PayloadTooLarge(usize),
}

/// One decoded chunk, borrowing its payload from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub tag: [u8; 4],
    pub payload: &'a [u8],
}

impl Chunk<'_> {
    /// Tag as text, with non-ASCII bytes dropped and trailing padding trimmed.
    pub fn tag_str(&self) -> String {
        self.tag
            .iter()
            .filter(|b| b.is_ascii())
            .map(|&b| char::from(b))
            .collect::<String>()
            .trim_end_matches([' ', '\0'])
            .to_string()
    }
}

/// Split a buffer into consecutive chunks.
///
/// Stops silently at a truncated header. A payload cut short by the end of
/// the buffer is returned as far as it goes and ends the sequence.
pub fn decode_chunks(data: &[u8]) -> Vec<Chunk<'_>> {
    let mut chunks = Vec::new();
    let mut rest = data;

    while rest.len() >= HEADER_LEN {
        let (header, body) = rest.split_at(HEADER_LEN);
        let tag = [header[0], header[1], header[2], header[3]];
        let declared = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let len = usize::try_from(declared).unwrap_or(usize::MAX).min(body.len());

        let (payload, remaining) = body.split_at(len);
        chunks.push(Chunk { tag, payload });
        rest = remaining;
    }

    if !rest.is_empty() {
        tracing::trace!(trailing = rest.len(), "ignoring truncated chunk header");
    }
    chunks
}

/// Append one chunk to `out`.
pub fn write_chunk(out: &mut Vec<u8>, tag: [u8; 4], payload: &[u8]) -> Result<(), ChunkError> {
    let len = u32::try_from(payload.len()).map_err(|_| ChunkError::PayloadTooLarge(payload.len()))?;
    out.extend_from_slice(&tag);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Encode a sequence of chunks.
pub fn encode_chunks<'a, I>(chunks: I) -> Result<Vec<u8>, ChunkError>
where
    I: IntoIterator<Item = ([u8; 4], &'a [u8])>,
{
    let mut out = Vec::new();
    for (tag, payload) in chunks {
        write_chunk(&mut out, tag, payload)?;
    }
    Ok(out)
}
