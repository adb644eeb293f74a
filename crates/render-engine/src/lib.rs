//! Decksnap Render Engine
//!
//! Turns a [`DeckExportRequest`](decksnap_deck_model::DeckExportRequest)
//! into a single PNG that shows the deck and carries its descriptor.
//!
//! # Pipeline Architecture
//!
//! ```text
//! request ──┬── validate
//!           ├── QR encode (payload) ─────────────────────────┐
//!           └── thumbnail loader (tokio, capped) ──┐         │
//!                                                  ▼         │
//!                                   layout (loaded counts)   │
//!                                                  │         │
//!                                                  ▼         ▼
//!                         compositor: background, title, zones, QR, stamp
//!                                                  │
//!                                                  ▼
//!                                   PNG encode ── embed descriptor (tEXt)
//!                                                  │
//!                                                  ▼
//!                                           EncodedImage
//! ```

pub mod assets;
pub mod compositor;
pub mod export;
pub mod layout;
pub mod qr;
pub mod text;
pub mod thumbnails;

pub use assets::RenderAssets;
pub use export::*;
pub use layout::{compute_layout, LayoutPlan, PixelRect, ZoneSize};
pub use qr::{QrErrorCorrection, QrMatrix};
pub use thumbnails::{DirectorySource, LoadedZone, MemorySource, ThumbnailLoader, ThumbnailSource};
