//! PNG chunk walking and writing.

use std::fmt;

use decksnap_common::error::{DecksnapError, DecksnapResult};
use serde::Serialize;

use crate::crc::chunk_crc;

/// The fixed 8-byte PNG signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Terminal chunk type.
pub const IEND: [u8; 4] = *b"IEND";

/// Length + type + CRC around every chunk's data.
pub const CHUNK_OVERHEAD: usize = 12;

/// PNG caps chunk lengths at 2^31 - 1.
const MAX_CHUNK_LEN: u32 = 0x7FFF_FFFF;

/// Whether `bytes` begins with the PNG signature.
pub fn has_png_signature(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// A chunk borrowed from an underlying PNG stream.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChunkRef<'a> {
    /// Byte offset of the length field within the stream.
    pub offset: usize,
    pub chunk_type: [u8; 4],
    pub data: &'a [u8],
    /// CRC as stored in the stream (not yet verified).
    pub crc: u32,
}

impl<'a> ChunkRef<'a> {
    pub fn length(&self) -> u32 {
        self.data.len() as u32
    }

    /// Offset one past this chunk's CRC.
    pub fn end(&self) -> usize {
        self.offset + CHUNK_OVERHEAD + self.data.len()
    }

    pub fn is_terminal(&self) -> bool {
        self.chunk_type == IEND
    }

    /// Critical chunks have an uppercase first letter.
    pub fn is_critical(&self) -> bool {
        self.chunk_type[0].is_ascii_uppercase()
    }

    /// Recompute the CRC over type and data and compare with the stored one.
    pub fn crc_is_valid(&self) -> bool {
        chunk_crc(&self.chunk_type, self.data) == self.crc
    }

    pub fn type_name(&self) -> String {
        String::from_utf8_lossy(&self.chunk_type).into_owned()
    }
}

impl fmt::Debug for ChunkRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkRef")
            .field("offset", &self.offset)
            .field("type", &self.type_name())
            .field("length", &self.data.len())
            .field("crc", &format_args!("{:08x}", self.crc))
            .finish()
    }
}

/// Iterates chunks from just after the signature up to and including `IEND`.
///
/// Yields an error, then stops, when a chunk overruns the buffer or the
/// stream ends before `IEND`. Bytes after `IEND` are never read.
#[derive(Debug, Clone)]
pub struct ChunkWalker<'a> {
    bytes: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ChunkWalker<'a> {
    /// Start walking `bytes`; fails with [`DecksnapError::NotPng`] when the
    /// signature is missing.
    pub fn new(bytes: &'a [u8]) -> DecksnapResult<Self> {
        if !has_png_signature(bytes) {
            return Err(DecksnapError::NotPng);
        }
        Ok(Self {
            bytes,
            pos: PNG_SIGNATURE.len(),
            done: false,
        })
    }

    fn read_chunk(&self) -> DecksnapResult<ChunkRef<'a>> {
        let pos = self.pos;
        let remaining = self.bytes.len() - pos;
        if remaining == 0 {
            return Err(DecksnapError::malformed(format!(
                "stream ended at offset {pos} before the IEND chunk"
            )));
        }
        if remaining < CHUNK_OVERHEAD {
            return Err(DecksnapError::malformed(format!(
                "truncated chunk header at offset {pos} ({remaining} bytes left)"
            )));
        }

        let length = read_u32(self.bytes, pos);
        let mut chunk_type = [0u8; 4];
        chunk_type.copy_from_slice(&self.bytes[pos + 4..pos + 8]);

        if !chunk_type.iter().all(u8::is_ascii_alphabetic) {
            return Err(DecksnapError::malformed(format!(
                "invalid chunk type {chunk_type:02x?} at offset {pos}"
            )));
        }
        if length > MAX_CHUNK_LEN {
            return Err(DecksnapError::malformed(format!(
                "chunk {} at offset {pos} declares an oversized length {length}",
                String::from_utf8_lossy(&chunk_type)
            )));
        }

        let data_start = pos + 8;
        let data_end = usize::try_from(length)
            .ok()
            .and_then(|len| data_start.checked_add(len))
            .filter(|end| {
                end.checked_add(4)
                    .is_some_and(|crc_end| crc_end <= self.bytes.len())
            })
            .ok_or_else(|| {
                DecksnapError::malformed(format!(
                    "chunk {} at offset {pos} declares {length} data bytes but only {} remain",
                    String::from_utf8_lossy(&chunk_type),
                    remaining - CHUNK_OVERHEAD
                ))
            })?;

        Ok(ChunkRef {
            offset: pos,
            chunk_type,
            data: &self.bytes[data_start..data_end],
            crc: read_u32(self.bytes, data_end),
        })
    }
}

impl<'a> Iterator for ChunkWalker<'a> {
    type Item = DecksnapResult<ChunkRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_chunk() {
            Ok(chunk) => {
                self.pos = chunk.end();
                self.done = chunk.is_terminal();
                Some(Ok(chunk))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn read_u32(bytes: &[u8], pos: usize) -> u32 {
    u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
}

/// Offset of the `IEND` chunk's length field.
pub fn find_terminal(bytes: &[u8]) -> DecksnapResult<usize> {
    for chunk in ChunkWalker::new(bytes)? {
        let chunk = chunk?;
        if chunk.is_terminal() {
            return Ok(chunk.offset);
        }
    }
    // The walker only stops cleanly after IEND.
    Err(DecksnapError::malformed("IEND chunk not found"))
}

/// Append a complete chunk (length, type, data, CRC) to `out`.
pub fn write_chunk(out: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) -> DecksnapResult<()> {
    let length = u32::try_from(data.len())
        .ok()
        .filter(|len| *len <= MAX_CHUNK_LEN)
        .ok_or_else(|| {
            DecksnapError::metadata(format!("chunk data of {} bytes is too large", data.len()))
        })?;

    out.reserve(CHUNK_OVERHEAD + data.len());
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(chunk_type, data).to_be_bytes());
    Ok(())
}

/// One row of a chunk listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkSummary {
    pub offset: usize,
    pub chunk_type: String,
    pub length: u32,
    pub critical: bool,
    pub crc_valid: bool,
}

/// List every chunk up to `IEND`, with CRC validity.
pub fn list_chunks(bytes: &[u8]) -> DecksnapResult<Vec<ChunkSummary>> {
    ChunkWalker::new(bytes)?
        .map(|chunk| {
            chunk.map(|c| ChunkSummary {
                offset: c.offset,
                chunk_type: c.type_name(),
                length: c.length(),
                critical: c.is_critical(),
                crc_valid: c.crc_is_valid(),
            })
        })
        .collect()
}
