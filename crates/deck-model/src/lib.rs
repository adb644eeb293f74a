//! Decksnap Deck Model
//!
//! Defines the data contracts shared by the compositor and the container
//! codec:
//! - **Request:** Zones of thumbnail references plus rendering options
//! - **Palette:** The closed set of color variants
//! - **Descriptor:** The compact, reconstructible deck record embedded in
//!   exported images
//!
//! These types carry no card semantics. Card identifiers are opaque strings.

pub mod descriptor;
pub mod palette;
pub mod request;

pub use descriptor::*;
pub use palette::*;
pub use request::*;
