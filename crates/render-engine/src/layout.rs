//! Deck image geometry.
//!
//! All constants are in unscaled pixels. Every coordinate is computed in
//! unscaled space first, then multiplied by the scale factor and rounded
//! once, so a plan at scale `s` matches the scale-1 plan times `s` to
//! within one device pixel.
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │▌ Title                                │  HEADER_HEIGHT
//! ├───────────────────────────────────────┤
//! │ ◆ Main Deck: 40 Cards                 │  ZONE_HEADER_HEIGHT
//! │ ▢ ▢ ▢ ▢ ▢ ▢ ▢ ▢ ▢ ▢                   │  rows × ROW_PITCH
//! │ ▢ ▢ ▢ …                               │
//! ├───────────────────────────────────────┤
//! │ Exported 2024-03-09             ▓▓▓▓ │  footer band (QR band when enabled)
//! └───────────────────────────────────────┘
//! ```

use decksnap_common::error::{DecksnapError, DecksnapResult};
use decksnap_deck_model::request::ZoneId;
use serde::Serialize;

/// Cells per grid row. Fixed so every export looks the same.
pub const CARDS_PER_ROW: usize = 10;

pub const CARD_WIDTH: f64 = 86.0;
pub const CARD_HEIGHT: f64 = 125.0;
pub const CARD_GAP: f64 = 4.0;
pub const SIDE_PADDING: f64 = 16.0;

pub const HEADER_HEIGHT: f64 = 72.0;
pub const ZONE_HEADER_HEIGHT: f64 = 36.0;

/// Footer band holding only the date stamp.
pub const FOOTER_HEIGHT: f64 = 28.0;

pub const QR_SIZE: f64 = 120.0;
pub const QR_MARGIN: f64 = 12.0;

/// Footer band when the QR code is drawn.
pub const QR_BAND_HEIGHT: f64 = QR_SIZE + 2.0 * QR_MARGIN;

pub const COLUMN_PITCH: f64 = CARD_WIDTH + CARD_GAP;
pub const ROW_PITCH: f64 = CARD_HEIGHT + CARD_GAP;

pub const CANVAS_WIDTH: f64 =
    2.0 * SIDE_PADDING + CARDS_PER_ROW as f64 * COLUMN_PITCH - CARD_GAP;

/// Largest canvas side accepted before allocation.
pub const MAX_CANVAS_DIMENSION: u32 = 32_768;

/// Size input for one zone: how many cells will actually be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSize {
    pub zone_id: ZoneId,
    pub label: String,
    pub cells: usize,
}

impl ZoneSize {
    pub fn new(zone_id: ZoneId, label: impl Into<String>, cells: usize) -> Self {
        Self {
            zone_id,
            label: label.into(),
            cells,
        }
    }
}

/// Axis-aligned rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Placement of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellPlacement {
    pub col: usize,
    pub row: usize,
    pub x: u32,
    pub y: u32,
}

/// Placement of one rendered zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZonePlacement {
    pub zone_id: ZoneId,
    pub label: String,
    pub header_y: u32,
    pub header_height: u32,
    pub grid_origin_y: u32,
    pub rows: usize,
    pub cells: Vec<CellPlacement>,
}

/// Footer band placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FooterPlacement {
    pub y: u32,
    pub height: u32,
    /// QR square, flush bottom-right with a fixed margin.
    pub qr: Option<PixelRect>,
}

/// Complete geometry for one export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutPlan {
    pub scale: f64,
    pub width: u32,
    pub height: u32,
    pub header_height: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    pub zones: Vec<ZonePlacement>,
    pub footer: FooterPlacement,
}

impl LayoutPlan {
    pub fn zone(&self, zone_id: ZoneId) -> Option<&ZonePlacement> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }

    pub fn total_cells(&self) -> usize {
        self.zones.iter().map(|z| z.cells.len()).sum()
    }

    /// Device-pixel rectangle of one cell.
    pub fn cell_rect(&self, cell: &CellPlacement) -> PixelRect {
        PixelRect {
            x: cell.x,
            y: cell.y,
            width: self.cell_width,
            height: self.cell_height,
        }
    }
}

/// Round an unscaled length to device pixels.
fn device(value: f64, scale: f64) -> u32 {
    (value * scale).round().max(0.0) as u32
}

/// `ceil(cells / CARDS_PER_ROW)`.
pub fn rows_for(cells: usize) -> usize {
    cells.div_ceil(CARDS_PER_ROW)
}

/// Compute the full geometry for the given zone sizes.
///
/// Zones with zero cells contribute nothing. An empty zone list still
/// yields the header and footer bands.
pub fn compute_layout(
    zones: &[ZoneSize],
    scale: f64,
    include_qr: bool,
) -> DecksnapResult<LayoutPlan> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(DecksnapError::invalid_request(format!(
            "scale must be a positive number, got {scale}"
        )));
    }

    // Size the canvas before placing any cell so an oversized deck is
    // rejected without walking its cells.
    let body_height: f64 = zones
        .iter()
        .filter(|z| z.cells > 0)
        .map(|z| ZONE_HEADER_HEIGHT + rows_for(z.cells) as f64 * ROW_PITCH)
        .sum();
    let footer_top = HEADER_HEIGHT + body_height;
    let footer_height = if include_qr {
        QR_BAND_HEIGHT
    } else {
        FOOTER_HEIGHT
    };
    let total_height = footer_top + footer_height;

    let width = device(CANVAS_WIDTH, scale);
    let height = device(total_height, scale);
    if width == 0 || height == 0 {
        return Err(DecksnapError::render(format!(
            "scale {scale} yields an empty {width}x{height} canvas"
        )));
    }
    if width > MAX_CANVAS_DIMENSION || height > MAX_CANVAS_DIMENSION {
        return Err(DecksnapError::invalid_request(format!(
            "canvas {width}x{height} exceeds the {MAX_CANVAS_DIMENSION}px limit"
        )));
    }

    let mut cursor = HEADER_HEIGHT;
    let mut placements = Vec::with_capacity(zones.len());

    for zone in zones.iter().filter(|z| z.cells > 0) {
        let rows = rows_for(zone.cells);
        let header_top = cursor;
        let grid_top = header_top + ZONE_HEADER_HEIGHT;

        let cells = (0..zone.cells)
            .map(|index| {
                let col = index % CARDS_PER_ROW;
                let row = index / CARDS_PER_ROW;
                CellPlacement {
                    col,
                    row,
                    x: device(SIDE_PADDING + col as f64 * COLUMN_PITCH, scale),
                    y: device(grid_top + row as f64 * ROW_PITCH, scale),
                }
            })
            .collect();

        placements.push(ZonePlacement {
            zone_id: zone.zone_id,
            label: zone.label.clone(),
            header_y: device(header_top, scale),
            header_height: device(grid_top, scale) - device(header_top, scale),
            grid_origin_y: device(grid_top, scale),
            rows,
            cells,
        });

        cursor = grid_top + rows as f64 * ROW_PITCH;
    }

    let qr = include_qr.then(|| {
        let size = device(QR_SIZE, scale);
        let margin = device(QR_MARGIN, scale);
        PixelRect {
            x: width.saturating_sub(margin + size),
            y: height.saturating_sub(margin + size),
            width: size,
            height: size,
        }
    });

    let footer_y = device(cursor, scale);
    Ok(LayoutPlan {
        scale,
        width,
        height,
        header_height: device(HEADER_HEIGHT, scale),
        cell_width: device(CARD_WIDTH, scale),
        cell_height: device(CARD_HEIGHT, scale),
        zones: placements,
        footer: FooterPlacement {
            y: footer_y,
            height: height - footer_y,
            qr,
        },
    })
}
