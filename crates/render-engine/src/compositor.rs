//! Deck compositor: paints a [`LayoutPlan`] onto an RGBA canvas.
//!
//! Stages run in a fixed order, each painting over the previous one:
//! background gradient, accent bar, title, zones (header bar, icon, label,
//! cells), QR code with optional watermark, footer stamp. The canvas is
//! owned by a single call; nothing is shared between exports.

use chrono::NaiveDate;
use decksnap_common::clock::footer_stamp;
use decksnap_common::error::{DecksnapError, DecksnapResult};
use decksnap_deck_model::palette::{Color, Palette};
use decksnap_deck_model::request::DeckExportRequest;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use crate::assets::RenderAssets;
use crate::layout::{
    LayoutPlan, PixelRect, ZonePlacement, QR_MARGIN, SIDE_PADDING,
};
use crate::qr::QrMatrix;
use crate::text::{self, Stroke};
use crate::thumbnails::LoadedZone;

/// Width of the accent bar at the left of the title band.
pub const ACCENT_WIDTH: f64 = 6.0;

/// Gap between the accent bar and the title.
pub const TITLE_INSET: f64 = 16.0;

/// Border drawn around each thumbnail.
pub const CELL_INSET: f64 = 2.0;

/// Watermark drawn over the QR code of private decks.
pub const PRIVATE_WATERMARK: &str = "PRIVATE";

const TITLE_GLYPH_SCALE: u32 = 3;
const LABEL_GLYPH_SCALE: u32 = 2;
const STAMP_GLYPH_SCALE: u32 = 2;
const ICON_FRACTION: f64 = 0.7;

/// Everything one composition needs. Borrowed, so the caller keeps
/// ownership of loaded thumbnails and assets.
#[derive(Debug, Clone, Copy)]
pub struct CompositionInput<'a> {
    pub plan: &'a LayoutPlan,
    /// Loaded zones in request order. Empty zones are skipped.
    pub zones: &'a [LoadedZone],
    pub request: &'a DeckExportRequest,
    pub assets: &'a RenderAssets,
    /// Pre-encoded QR symbol; required when the plan reserves a QR square.
    pub qr: Option<&'a QrMatrix>,
    pub stamp_date: NaiveDate,
}

/// Paint the deck image.
pub fn compose(input: CompositionInput<'_>) -> DecksnapResult<RgbaImage> {
    let plan = input.plan;
    if plan.width == 0 || plan.height == 0 {
        return Err(DecksnapError::render(format!(
            "cannot paint a {}x{} canvas",
            plan.width, plan.height
        )));
    }

    let drawn: Vec<&LoadedZone> = input.zones.iter().filter(|z| !z.images.is_empty()).collect();
    if drawn.len() != plan.zones.len() {
        return Err(DecksnapError::render(format!(
            "layout has {} zones but {} zones have thumbnails",
            plan.zones.len(),
            drawn.len()
        )));
    }

    let palette = input.request.color_variant.palette();
    let mut canvas = Canvas {
        img: RgbaImage::new(plan.width, plan.height),
        palette,
        scale: plan.scale,
    };

    canvas.paint_background();
    canvas.paint_accent_bar(plan.header_height);
    canvas.paint_title(&input.request.title, plan.header_height);

    for (placement, zone) in plan.zones.iter().zip(&drawn) {
        canvas.paint_zone(plan, placement, zone, input.assets)?;
    }

    if let Some(rect) = plan.footer.qr {
        let qr = input.qr.ok_or_else(|| {
            DecksnapError::render("layout reserves a QR square but no QR symbol was encoded")
        })?;
        qr.draw(&mut canvas.img, rect)?;
        if input.request.is_private {
            canvas.paint_watermark(rect);
        }
    }

    canvas.paint_footer_stamp(plan, input.stamp_date);

    tracing::debug!(
        width = plan.width,
        height = plan.height,
        zones = plan.zones.len(),
        cells = plan.total_cells(),
        "Composed deck image"
    );
    Ok(canvas.img)
}

/// Encode the finished canvas as PNG.
pub fn encode_png(img: &RgbaImage) -> DecksnapResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| DecksnapError::render(format!("PNG encoding failed: {e}")))?;
    Ok(bytes)
}

fn rgba(color: Color) -> Rgba<u8> {
    let [r, g, b] = color.to_array();
    Rgba([r, g, b, 255])
}

struct Canvas {
    img: RgbaImage,
    palette: Palette,
    scale: f64,
}

impl Canvas {
    fn px(&self, value: f64) -> u32 {
        (value * self.scale).round().max(0.0) as u32
    }

    fn fill(&mut self, rect: PixelRect, color: Rgba<u8>) {
        let x_end = rect.right().min(self.img.width());
        let y_end = rect.bottom().min(self.img.height());
        for y in rect.y..y_end {
            for x in rect.x..x_end {
                self.img.put_pixel(x, y, color);
            }
        }
    }

    /// Linear gradient from the north-east corner to the south-west corner.
    fn paint_background(&mut self) {
        let (w, h) = self.img.dimensions();
        let (ne, sw) = (self.palette.background_ne, self.palette.background_sw);
        let wf = (w.max(2) - 1) as f64;
        let hf = (h.max(2) - 1) as f64;
        for (x, y, px) in self.img.enumerate_pixels_mut() {
            let t = ((wf - x as f64) / wf + y as f64 / hf) / 2.0;
            *px = rgba(Color::lerp(ne, sw, t));
        }
    }

    fn paint_accent_bar(&mut self, header_height: u32) {
        let rect = PixelRect {
            x: 0,
            y: 0,
            width: self.px(ACCENT_WIDTH).max(1),
            height: header_height,
        };
        self.fill(rect, rgba(self.palette.accent));
    }

    fn paint_title(&mut self, title: &str, header_height: u32) {
        let title = title.trim();
        if title.is_empty() {
            return;
        }
        let gs = text::glyph_scale(TITLE_GLYPH_SCALE, self.scale);
        let x = self.px(ACCENT_WIDTH + TITLE_INSET);
        let y = header_height.saturating_sub(text::text_height(gs)) / 2;
        let max_width = self.img.width().saturating_sub(x + self.px(SIDE_PADDING));
        let visible = text::fit_text(title, gs, max_width);
        let color = rgba(self.palette.font);
        text::draw_text(&mut self.img, x as i64, y as i64, visible, gs, color);
    }

    fn paint_zone(
        &mut self,
        plan: &LayoutPlan,
        placement: &ZonePlacement,
        zone: &LoadedZone,
        assets: &RenderAssets,
    ) -> DecksnapResult<()> {
        if placement.zone_id != zone.zone_id || placement.cells.len() != zone.images.len() {
            return Err(DecksnapError::render(format!(
                "layout reserves {} cells for {} but {} has {} thumbnails",
                placement.cells.len(),
                placement.zone_id,
                zone.zone_id,
                zone.images.len()
            )));
        }

        // East-to-west header bar.
        let width = self.img.width();
        let (east, west) = (self.palette.header_east, self.palette.header_west);
        let wf = (width.max(2) - 1) as f64;
        let y_end = (placement.header_y + placement.header_height).min(self.img.height());
        for y in placement.header_y..y_end {
            for x in 0..width {
                let t = (wf - x as f64) / wf;
                self.img.put_pixel(x, y, rgba(Color::lerp(east, west, t)));
            }
        }

        let icon_side = ((placement.header_height as f64) * ICON_FRACTION).round().max(1.0) as u32;
        let icon_x = self.px(SIDE_PADDING);
        let icon_y = placement.header_y + placement.header_height.saturating_sub(icon_side) / 2;
        if let Some(icon) = assets.icon(zone.zone_id) {
            let icon = imageops::resize(icon, icon_side, icon_side, FilterType::Triangle);
            imageops::overlay(&mut self.img, &icon, icon_x as i64, icon_y as i64);
        }

        let label = format!("{}: {} Cards", placement.label, zone.images.len());
        let gs = text::glyph_scale(LABEL_GLYPH_SCALE, self.scale);
        let label_x = icon_x + icon_side + self.px(SIDE_PADDING / 2.0);
        let label_y = placement.header_y + placement.header_height.saturating_sub(text::text_height(gs)) / 2;
        let max_width = width.saturating_sub(label_x + self.px(SIDE_PADDING));
        let visible = text::fit_text(&label, gs, max_width);
        let color = rgba(self.palette.font);
        text::draw_text(&mut self.img, label_x as i64, label_y as i64, visible, gs, color);

        let border = rgba(self.palette.border);
        let inset = self.px(CELL_INSET).max(1);
        for (cell, thumbnail) in placement.cells.iter().zip(&zone.images) {
            let rect = plan.cell_rect(cell);
            self.fill(rect, border);

            let inner_w = rect.width.saturating_sub(2 * inset);
            let inner_h = rect.height.saturating_sub(2 * inset);
            if inner_w == 0 || inner_h == 0 {
                continue;
            }
            let fitted = imageops::resize(thumbnail, inner_w, inner_h, FilterType::Triangle);
            imageops::overlay(
                &mut self.img,
                &fitted,
                (rect.x + inset) as i64,
                (rect.y + inset) as i64,
            );
        }
        Ok(())
    }

    /// Double-stroked watermark centered on the QR square, clipped to it.
    fn paint_watermark(&mut self, rect: PixelRect) {
        if rect.is_empty() {
            return;
        }
        let glyph_scale = ((rect.width * 3 / 5) / text::text_width(PRIVATE_WATERMARK, 1)).max(1);
        let inner = Stroke {
            color: rgba(self.palette.accent),
            radius: glyph_scale,
        };
        let outer = Stroke {
            color: rgba(self.palette.border),
            radius: glyph_scale + (glyph_scale / 2).max(1),
        };

        let mut patch = imageops::crop_imm(&self.img, rect.x, rect.y, rect.width, rect.height).to_image();
        let text_w = text::text_width(PRIVATE_WATERMARK, glyph_scale) as i64;
        let text_h = text::text_height(glyph_scale) as i64;
        let x = (rect.width as i64 - text_w) / 2;
        let y = (rect.height as i64 - text_h) / 2;
        text::draw_text_double_stroked(
            &mut patch,
            x,
            y,
            PRIVATE_WATERMARK,
            glyph_scale,
            outer,
            inner,
            rgba(self.palette.font),
        );
        imageops::replace(&mut self.img, &patch, rect.x as i64, rect.y as i64);
    }

    /// Date stamp at the bottom-left of the footer band, clipped short of
    /// the QR square.
    fn paint_footer_stamp(&mut self, plan: &LayoutPlan, date: NaiveDate) {
        let stamp = footer_stamp(date);
        let gs = text::glyph_scale(STAMP_GLYPH_SCALE, self.scale)
            .min((plan.footer.height / text::GLYPH_PX).max(1));
        let text_h = text::text_height(gs);
        let x = self.px(SIDE_PADDING);

        let (y, right_limit) = match plan.footer.qr {
            Some(qr) => (
                qr.bottom().saturating_sub(text_h),
                qr.x.saturating_sub(self.px(QR_MARGIN)),
            ),
            None => (
                plan.footer.y + plan.footer.height.saturating_sub(text_h) / 2,
                plan.width.saturating_sub(self.px(SIDE_PADDING)),
            ),
        };
        let visible = text::fit_text(&stamp, gs, right_limit.saturating_sub(x));
        let color = rgba(self.palette.font);
        text::draw_text(&mut self.img, x as i64, y as i64, visible, gs, color);
    }
}
