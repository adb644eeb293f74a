//! Deck descriptor embedding via a `tEXt` chunk.

use decksnap_common::error::{DecksnapError, DecksnapResult};
use decksnap_deck_model::descriptor::DeckDescriptor;

use crate::chunk::{find_terminal, write_chunk, ChunkWalker, CHUNK_OVERHEAD};

/// Chunk type carrying the descriptor.
pub const TEXT_CHUNK: [u8; 4] = *b"tEXt";

/// `tEXt` keyword identifying this application's payload.
pub const METADATA_KEYWORD: &str = "decksnap.deck";

/// Result of probing a byte stream for an embedded descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// A structurally valid descriptor with a valid CRC.
    Found(DeckDescriptor),
    /// A well-formed PNG with no trustworthy descriptor.
    NotFound,
    /// The bytes are not a PNG stream at all.
    NotPng,
}

impl ExtractOutcome {
    pub fn found(self) -> Option<DeckDescriptor> {
        match self {
            ExtractOutcome::Found(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ExtractOutcome::Found(_))
    }
}

/// `keyword NUL value`.
fn text_chunk_data(keyword: &str, value: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
    data.extend_from_slice(keyword.as_bytes());
    data.push(0);
    data.extend_from_slice(value.as_bytes());
    data
}

/// Split `tEXt` data on its first NUL.
fn split_text_data(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let nul = data.iter().position(|b| *b == 0)?;
    Some((&data[..nul], &data[nul + 1..]))
}

/// Return a copy of `image` with `descriptor` stored in a new `tEXt` chunk
/// placed immediately before `IEND`.
///
/// Fails without producing bytes when the descriptor is invalid, the input
/// is not a PNG, or the chunk stream is malformed.
pub fn embed(image: &[u8], descriptor: &DeckDescriptor) -> DecksnapResult<Vec<u8>> {
    descriptor.validate()?;
    let terminal = find_terminal(image)?;

    let value = descriptor.to_compact_json()?;
    let data = text_chunk_data(METADATA_KEYWORD, &value);

    let mut out = Vec::with_capacity(image.len() + CHUNK_OVERHEAD + data.len());
    out.extend_from_slice(&image[..terminal]);
    write_chunk(&mut out, &TEXT_CHUNK, &data)?;
    out.extend_from_slice(&image[terminal..]);

    tracing::debug!(
        offset = terminal,
        payload_bytes = value.len(),
        cards = descriptor.main.len() + descriptor.extra.len() + descriptor.side.len(),
        "Embedded deck descriptor"
    );
    Ok(out)
}

/// Probe `bytes` for an embedded descriptor.
///
/// Non-PNG input and untrustworthy payloads are outcomes, not errors; a
/// malformed chunk stream is an error. When several valid records exist the
/// last one wins.
pub fn extract(bytes: &[u8]) -> DecksnapResult<ExtractOutcome> {
    let walker = match ChunkWalker::new(bytes) {
        Ok(walker) => walker,
        Err(DecksnapError::NotPng) => return Ok(ExtractOutcome::NotPng),
        Err(e) => return Err(e),
    };

    let mut found = None;
    for chunk in walker {
        let chunk = chunk?;
        if chunk.chunk_type != TEXT_CHUNK {
            continue;
        }
        let Some((keyword, value)) = split_text_data(chunk.data) else {
            continue;
        };
        if keyword != METADATA_KEYWORD.as_bytes() {
            continue;
        }
        if !chunk.crc_is_valid() {
            tracing::warn!(offset = chunk.offset, "Ignoring deck metadata chunk with bad CRC");
            continue;
        }

        let parsed = std::str::from_utf8(value)
            .map_err(|e| DecksnapError::metadata(format!("payload is not UTF-8: {e}")))
            .and_then(DeckDescriptor::from_json);
        match parsed {
            Ok(descriptor) => found = Some(descriptor),
            Err(e) => {
                tracing::warn!(offset = chunk.offset, error = %e, "Ignoring invalid deck metadata");
            }
        }
    }

    Ok(found.map_or(ExtractOutcome::NotFound, ExtractOutcome::Found))
}
