//! Export request types.
//!
//! A [`DeckExportRequest`] is fully resolved by the caller: thumbnail
//! references are opaque source identifiers and nothing in the request
//! implies network access by itself.

use std::fmt;

use decksnap_common::error::{DecksnapError, DecksnapResult};
use serde::{Deserialize, Serialize};

use crate::palette::ColorVariant;

/// Largest accepted scale factor.
pub const MAX_SCALE: f64 = 8.0;

/// Largest accepted repeat count for one thumbnail, matching the largest
/// card quantity a descriptor may record.
pub const MAX_REPEAT_COUNT: u32 = crate::descriptor::MAX_QUANTITY as u32;

/// The three deck zones, in their canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneId {
    Primary,
    Auxiliary,
    Reserve,
}

impl ZoneId {
    pub const ALL: [ZoneId; 3] = [ZoneId::Primary, ZoneId::Auxiliary, ZoneId::Reserve];

    /// Key used for this zone inside the embedded deck descriptor.
    pub fn descriptor_key(self) -> &'static str {
        match self {
            ZoneId::Primary => "main",
            ZoneId::Auxiliary => "extra",
            ZoneId::Reserve => "side",
        }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ZoneId::Primary => "primary",
            ZoneId::Auxiliary => "auxiliary",
            ZoneId::Reserve => "reserve",
        };
        f.write_str(name)
    }
}

/// One logical card, drawn `repeat_count` times in sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRef {
    /// Opaque identifier the thumbnail source resolves (id, path, or URL).
    pub source_id: String,

    /// Number of grid cells this card occupies.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
}

fn default_repeat_count() -> u32 {
    1
}

impl ThumbnailRef {
    pub fn new(source_id: impl Into<String>, repeat_count: u32) -> Self {
        Self {
            source_id: source_id.into(),
            repeat_count,
        }
    }
}

/// A labelled zone of thumbnails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportZone {
    pub zone_id: ZoneId,

    /// Label drawn in the zone header (e.g. "Main Deck").
    pub display_label: String,

    /// Thumbnails in display order.
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailRef>,
}

impl ExportZone {
    pub fn new(zone_id: ZoneId, display_label: impl Into<String>) -> Self {
        Self {
            zone_id,
            display_label: display_label.into(),
            thumbnails: Vec::new(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail: ThumbnailRef) -> Self {
        self.thumbnails.push(thumbnail);
        self
    }

    /// Number of grid cells after expanding repeat counts.
    pub fn cell_count(&self) -> usize {
        self.thumbnails
            .iter()
            .fold(0usize, |total, t| total.saturating_add(t.repeat_count as usize))
    }

    /// Source ids in cell order, each repeated `repeat_count` times.
    pub fn expanded_source_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.thumbnails.iter().flat_map(|t| {
            std::iter::repeat(t.source_id.as_str()).take(t.repeat_count as usize)
        })
    }
}

/// Everything one export call needs, owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckExportRequest {
    /// Zones in display order.
    #[serde(default)]
    pub zones: Vec<ExportZone>,

    /// Title drawn in the header band; may be empty.
    #[serde(default)]
    pub title: String,

    /// Multiplier applied to every pixel constant.
    #[serde(default = "default_scale")]
    pub scale: f64,

    #[serde(default)]
    pub color_variant: ColorVariant,

    /// Whether to draw the viewer QR code.
    #[serde(default)]
    pub include_qr: bool,

    /// Canonical viewer URL, required when `include_qr` is set.
    #[serde(default)]
    pub qr_payload: Option<String>,

    /// Overlay a "private" watermark on the QR code.
    #[serde(default)]
    pub is_private: bool,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for DeckExportRequest {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            title: String::new(),
            scale: default_scale(),
            color_variant: ColorVariant::default(),
            include_qr: false,
            qr_payload: None,
            is_private: false,
        }
    }
}

impl DeckExportRequest {
    /// Check the request before any loading or drawing starts.
    pub fn validate(&self) -> DecksnapResult<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(DecksnapError::invalid_request(format!(
                "scale must be a positive number, got {}",
                self.scale
            )));
        }
        if self.scale > MAX_SCALE {
            return Err(DecksnapError::invalid_request(format!(
                "scale {} exceeds the maximum of {MAX_SCALE}",
                self.scale
            )));
        }

        let mut seen = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            if seen.contains(&zone.zone_id) {
                return Err(DecksnapError::invalid_request(format!(
                    "zone {} appears more than once",
                    zone.zone_id
                )));
            }
            seen.push(zone.zone_id);

            if let Some(bad) = zone.thumbnails.iter().find(|t| t.repeat_count == 0) {
                return Err(DecksnapError::invalid_request(format!(
                    "thumbnail {:?} in zone {} has a zero repeat count",
                    bad.source_id, zone.zone_id
                )));
            }
            if let Some(bad) = zone
                .thumbnails
                .iter()
                .find(|t| t.repeat_count > MAX_REPEAT_COUNT)
            {
                return Err(DecksnapError::invalid_request(format!(
                    "thumbnail {:?} in zone {} repeats {} times (max {MAX_REPEAT_COUNT})",
                    bad.source_id, zone.zone_id, bad.repeat_count
                )));
            }
        }

        if self.include_qr && self.qr_payload().is_none() {
            return Err(DecksnapError::invalid_request(
                "include_qr is set but no QR payload was supplied",
            ));
        }

        Ok(())
    }

    /// The QR payload, if present and non-blank.
    pub fn qr_payload(&self) -> Option<&str> {
        self.qr_payload
            .as_deref()
            .filter(|payload| !payload.trim().is_empty())
    }

    /// Zones that will actually be rendered: at least one cell.
    pub fn non_empty_zones(&self) -> impl Iterator<Item = &ExportZone> + '_ {
        self.zones.iter().filter(|zone| zone.cell_count() > 0)
    }

    /// Total requested cells across all zones.
    pub fn total_cells(&self) -> usize {
        self.zones
            .iter()
            .fold(0usize, |total, zone| total.saturating_add(zone.cell_count()))
    }
}
