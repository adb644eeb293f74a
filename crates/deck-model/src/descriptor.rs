//! The deck descriptor embedded in exported images.
//!
//! Wire form is compact JSON:
//!
//! ```text
//! {"main":[{"cid":"4007","ciid":"1","enc":"aB3x","quantity":3}],"extra":[],"side":[]}
//! ```
//!
//! Every field is a string or a small bounded integer, so the form
//! round-trips without loss. Parsing is strict: unknown fields, missing
//! fields, wrong primitive types, and out-of-range quantities are all
//! rejected.

use decksnap_common::error::{DecksnapError, DecksnapResult};
use serde::{Deserialize, Serialize};

use crate::request::ZoneId;

/// Upper bound for [`CardRecord::quantity`].
pub const MAX_QUANTITY: u8 = 99;

/// One card entry in a zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardRecord {
    /// Opaque card identifier.
    #[serde(rename = "cid")]
    pub card_id: String,

    /// Which artwork of the card is shown.
    #[serde(rename = "ciid")]
    pub image_variant: String,

    /// Integrity tag of the artwork, as issued by the image host.
    #[serde(rename = "enc")]
    pub integrity_tag: String,

    /// Copies of this card, `0..=99`.
    pub quantity: u8,
}

impl CardRecord {
    pub fn new(
        card_id: impl Into<String>,
        image_variant: impl Into<String>,
        integrity_tag: impl Into<String>,
        quantity: u8,
    ) -> Self {
        Self {
            card_id: card_id.into(),
            image_variant: image_variant.into(),
            integrity_tag: integrity_tag.into(),
            quantity,
        }
    }
}

/// Reconstructible description of a deck, one record list per zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeckDescriptor {
    pub main: Vec<CardRecord>,
    pub extra: Vec<CardRecord>,
    pub side: Vec<CardRecord>,
}

impl DeckDescriptor {
    pub fn zone(&self, zone: ZoneId) -> &[CardRecord] {
        match zone {
            ZoneId::Primary => &self.main,
            ZoneId::Auxiliary => &self.extra,
            ZoneId::Reserve => &self.side,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.extra.is_empty() && self.side.is_empty()
    }

    /// Reject records whose quantity is outside `0..=99`.
    pub fn validate(&self) -> DecksnapResult<()> {
        for zone in ZoneId::ALL {
            if let Some(record) = self.zone(zone).iter().find(|r| r.quantity > MAX_QUANTITY) {
                return Err(DecksnapError::invalid_request(format!(
                    "card {} in {} has quantity {} (maximum {MAX_QUANTITY})",
                    record.card_id,
                    zone.descriptor_key(),
                    record.quantity
                )));
            }
        }
        Ok(())
    }

    /// Compact JSON form, no insignificant whitespace.
    pub fn to_compact_json(&self) -> DecksnapResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and structurally validate the compact form.
    pub fn from_json(text: &str) -> DecksnapResult<Self> {
        let descriptor: DeckDescriptor = serde_json::from_str(text)
            .map_err(|e| DecksnapError::metadata(format!("descriptor is malformed: {e}")))?;
        descriptor
            .validate()
            .map_err(|e| DecksnapError::metadata(e.to_string()))?;
        Ok(descriptor)
    }
}
