//! Bitmap text drawing with the `font8x8` glyph tables.
//!
//! Glyphs are 8×8, one byte per row, bit 0 = leftmost pixel. Text is scaled
//! by integer factors only, so it stays crisp at every export scale.
//! Characters outside the basic and latin tables advance without drawing.

use font8x8::UnicodeFonts;
use image::{Rgba, RgbaImage};

/// Native glyph side in pixels.
pub const GLYPH_PX: u32 = 8;

/// Integer glyph scale for a base size at an export scale (never below 1).
pub fn glyph_scale(base: u32, scale: f64) -> u32 {
    (base as f64 * scale).round().max(1.0) as u32
}

/// Rendered width of `text` in pixels.
pub fn text_width(text: &str, glyph_scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_PX * glyph_scale
}

/// Rendered height of one line in pixels.
pub fn text_height(glyph_scale: u32) -> u32 {
    GLYPH_PX * glyph_scale
}

/// Longest prefix of `text` that fits in `max_width` pixels.
pub fn fit_text(text: &str, glyph_scale: u32, max_width: u32) -> &str {
    let per_char = GLYPH_PX * glyph_scale;
    let max_chars = (max_width / per_char.max(1)) as usize;
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn glyph(ch: char) -> Option<[u8; 8]> {
    font8x8::BASIC_FONTS
        .get(ch)
        .or_else(|| font8x8::LATIN_FONTS.get(ch))
}

fn draw_char(img: &mut RgbaImage, x: i64, y: i64, ch: char, glyph_scale: u32, color: Rgba<u8>) {
    let Some(rows) = glyph(ch) else {
        return;
    };
    let s = glyph_scale as i64;
    let (w, h) = (img.width() as i64, img.height() as i64);
    for (row, &bits) in rows.iter().enumerate() {
        for col in 0..GLYPH_PX as i64 {
            if bits & (1u8 << col) == 0 {
                continue;
            }
            for sy in 0..s {
                for sx in 0..s {
                    let px = x + col * s + sx;
                    let py = y + row as i64 * s + sy;
                    if (0..w).contains(&px) && (0..h).contains(&py) {
                        img.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
        }
    }
}

/// Draw `text` with its top-left corner at `(x, y)`, clipped to the image.
/// Returns the advance width.
pub fn draw_text(
    img: &mut RgbaImage,
    x: i64,
    y: i64,
    text: &str,
    glyph_scale: u32,
    color: Rgba<u8>,
) -> u32 {
    let advance = (GLYPH_PX * glyph_scale) as i64;
    for (i, ch) in text.chars().enumerate() {
        draw_char(img, x + i as i64 * advance, y, ch, glyph_scale, color);
    }
    text_width(text, glyph_scale)
}

/// One stroke pass: the text stamped at every offset within `radius`.
#[derive(Debug, Clone, Copy)]
pub struct Stroke {
    pub color: Rgba<u8>,
    pub radius: u32,
}

/// Draw `text` with an outer stroke, an inner stroke, then the fill.
pub fn draw_text_double_stroked(
    img: &mut RgbaImage,
    x: i64,
    y: i64,
    text: &str,
    glyph_scale: u32,
    outer: Stroke,
    inner: Stroke,
    fill: Rgba<u8>,
) {
    for stroke in [outer, inner] {
        let r = stroke.radius as i64;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx != 0 || dy != 0 {
                    draw_text(img, x + dx, y + dy, text, glyph_scale, stroke.color);
                }
            }
        }
    }
    draw_text(img, x, y, text, glyph_scale, fill);
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn count(img: &RgbaImage, color: Rgba<u8>) -> usize {
        img.pixels().filter(|p| **p == color).count()
    }

    #[test]
    fn test_metrics() {
        assert_eq!(text_width("Main", 2), 64);
        assert_eq!(text_height(3), 24);
        assert_eq!(glyph_scale(2, 0.2), 1);
        assert_eq!(glyph_scale(2, 1.5), 3);
    }

    #[test]
    fn test_fit_text_truncates_on_char_boundary() {
        assert_eq!(fit_text("Exported 2024-01-01", 1, 80), "Exported 2");
        assert_eq!(fit_text("ÄÖÜ", 1, 16), "ÄÖ");
        assert_eq!(fit_text("short", 1, 1000), "short");
        assert_eq!(fit_text("abc", 1, 0), "");
    }

    #[test]
    fn test_draw_text_marks_pixels_and_clips() {
        let mut img = RgbaImage::from_pixel(40, 10, BLACK);
        draw_text(&mut img, 0, 0, "AB", 1, WHITE);
        assert!(count(&img, WHITE) > 10);

        // Partially off-canvas must not panic.
        draw_text(&mut img, -5, -3, "Hello", 2, WHITE);
        draw_text(&mut img, 35, 8, "Hello", 2, WHITE);
    }

    #[test]
    fn test_blank_text_draws_nothing() {
        let mut img = RgbaImage::from_pixel(20, 10, BLACK);
        draw_text(&mut img, 0, 0, "  ", 1, WHITE);
        assert_eq!(count(&img, WHITE), 0);
    }

    #[test]
    fn test_double_stroke_layers() {
        let accent = Rgba([255, 0, 0, 255]);
        let dark = Rgba([0, 0, 40, 255]);
        let mut img = RgbaImage::from_pixel(60, 20, BLACK);
        draw_text_double_stroked(
            &mut img,
            6,
            4,
            "P",
            1,
            Stroke { color: dark, radius: 2 },
            Stroke { color: accent, radius: 1 },
            WHITE,
        );
        assert!(count(&img, dark) > 0);
        assert!(count(&img, accent) > 0);
        assert!(count(&img, WHITE) > 0);
    }
}
