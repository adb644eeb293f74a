//! Decksnap Container Codec
//!
//! Reads and writes the chunk layer of PNG streams so an exported deck
//! image doubles as its own save file.
//!
//! ```text
//! 89 50 4E 47 0D 0A 1A 0A                 signature
//! ┌────────┬──────┬──────────┬───────┐
//! │ length │ type │   data   │ CRC32 │    repeated, big-endian
//! └────────┴──────┴──────────┴───────┘
//! IHDR … IDAT … tEXt("decksnap.deck\0{json}") IEND
//! ```
//!
//! Embedding only inserts one ancillary `tEXt` chunk before `IEND`; no
//! existing byte is touched, so decoded pixels are unchanged.

pub mod chunk;
pub mod crc;
pub mod metadata;

pub use chunk::{list_chunks, ChunkRef, ChunkSummary, ChunkWalker, PNG_SIGNATURE};
pub use crc::crc32;
pub use metadata::{embed, extract, ExtractOutcome, METADATA_KEYWORD};
