//! Optional decorative assets.
//!
//! Icons are purely decorative. A zone without an icon is rendered without
//! one; the label keeps its position.

use std::collections::HashMap;

use decksnap_deck_model::request::ZoneId;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_polygon_mut};
use imageproc::point::Point;

/// Side of the built-in icons, before scaling into the header bar.
pub const BUILTIN_ICON_PX: u32 = 32;

/// Decorative images available to the compositor.
#[derive(Debug, Clone, Default)]
pub struct RenderAssets {
    icons: HashMap<ZoneId, RgbaImage>,
}

impl RenderAssets {
    /// No icons at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Procedurally drawn icons for every zone.
    pub fn builtin() -> Self {
        let mut assets = Self::none();
        for zone in ZoneId::ALL {
            assets.icons.insert(zone, builtin_icon(zone));
        }
        assets
    }

    pub fn with_icon(mut self, zone: ZoneId, icon: RgbaImage) -> Self {
        self.icons.insert(zone, icon);
        self
    }

    pub fn icon(&self, zone: ZoneId) -> Option<&RgbaImage> {
        self.icons
            .get(&zone)
            .filter(|icon| icon.width() > 0 && icon.height() > 0)
    }
}

fn builtin_icon(zone: ZoneId) -> RgbaImage {
    let side = BUILTIN_ICON_PX as i32;
    let mid = side / 2;
    let mut icon = RgbaImage::from_pixel(BUILTIN_ICON_PX, BUILTIN_ICON_PX, Rgba([0, 0, 0, 0]));
    let ink = Rgba([255, 255, 255, 230]);

    match zone {
        ZoneId::Primary => {
            // Diamond.
            let points = [
                Point::new(mid, 2),
                Point::new(side - 3, mid),
                Point::new(mid, side - 3),
                Point::new(2, mid),
            ];
            draw_polygon_mut(&mut icon, &points, ink);
        }
        ZoneId::Auxiliary => {
            // Hexagon.
            let q = side / 4;
            let points = [
                Point::new(q, 3),
                Point::new(side - q, 3),
                Point::new(side - 3, mid),
                Point::new(side - q, side - 4),
                Point::new(q, side - 4),
                Point::new(2, mid),
            ];
            draw_polygon_mut(&mut icon, &points, ink);
        }
        ZoneId::Reserve => {
            draw_filled_circle_mut(&mut icon, (mid, mid), mid - 3, ink);
        }
    }
    icon
}
