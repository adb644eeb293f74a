//! QR payload encoding and placement.
//!
//! The payload is an opaque viewer URL supplied by the caller. It is
//! encoded once, before any drawing, so an oversized payload fails the
//! export early instead of halfway through a render.

use std::fmt;
use std::str::FromStr;

use decksnap_common::error::{DecksnapError, DecksnapResult};
use image::{Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::layout::PixelRect;

/// Quiet zone around the matrix, in modules, when the square has room.
pub const QR_QUIET_MODULES: u32 = 4;

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrErrorCorrection {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery; leaves room for the private watermark.
    #[default]
    H,
}

impl QrErrorCorrection {
    fn ec_level(self) -> EcLevel {
        match self {
            QrErrorCorrection::L => EcLevel::L,
            QrErrorCorrection::M => EcLevel::M,
            QrErrorCorrection::Q => EcLevel::Q,
            QrErrorCorrection::H => EcLevel::H,
        }
    }
}

impl fmt::Display for QrErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            QrErrorCorrection::L => "L",
            QrErrorCorrection::M => "M",
            QrErrorCorrection::Q => "Q",
            QrErrorCorrection::H => "H",
        };
        f.write_str(level)
    }
}

impl FromStr for QrErrorCorrection {
    type Err = DecksnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(QrErrorCorrection::L),
            "M" | "MEDIUM" => Ok(QrErrorCorrection::M),
            "Q" | "QUARTILE" => Ok(QrErrorCorrection::Q),
            "H" | "HIGH" => Ok(QrErrorCorrection::H),
            other => Err(DecksnapError::config(format!(
                "Unknown QR error-correction level: {other}. Use: L, M, Q, H"
            ))),
        }
    }
}

/// An encoded QR symbol, row-major, `true` = dark.
#[derive(Clone, PartialEq, Eq)]
pub struct QrMatrix {
    width: usize,
    modules: Vec<bool>,
}

impl fmt::Debug for QrMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QrMatrix")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

impl QrMatrix {
    /// Encode `payload` at the given error-correction level.
    pub fn encode(payload: &str, level: QrErrorCorrection) -> DecksnapResult<Self> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), level.ec_level())
            .map_err(|e| {
                DecksnapError::qr(format!(
                    "cannot encode {} byte payload at level {level}: {e}",
                    payload.len()
                ))
            })?;
        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        Ok(Self { width, modules })
    }

    /// Modules per side.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.modules[y * self.width + x]
    }

    /// Whole pixels per module that fit in a square of `side` pixels,
    /// keeping the quiet zone when possible.
    pub fn module_px(&self, side: u32) -> u32 {
        let modules = self.width as u32;
        let with_quiet = side / (modules + 2 * QR_QUIET_MODULES);
        if with_quiet > 0 {
            with_quiet
        } else {
            (side / modules.max(1)).max(1)
        }
    }

    /// Side of the drawn symbol, without quiet zone, in a square of `side`
    /// pixels.
    pub fn symbol_px(&self, side: u32) -> u32 {
        self.width as u32 * self.module_px(side)
    }

    /// Whether every module fits in a square of `side` pixels at one pixel
    /// per module or more.
    pub fn fits(&self, side: u32) -> bool {
        self.symbol_px(side) <= side
    }

    /// Check that the whole symbol fits in `rect`.
    pub fn ensure_fits(&self, rect: PixelRect) -> DecksnapResult<()> {
        let side = rect.width.min(rect.height);
        if self.fits(side) {
            Ok(())
        } else {
            Err(DecksnapError::qr(format!(
                "a {0}x{0} module symbol does not fit the {side}px QR square; raise the scale",
                self.width
            )))
        }
    }

    /// Paint the symbol centered in `rect` on a light square.
    ///
    /// Fails without drawing when the symbol would not fit, since a cropped
    /// code cannot be scanned.
    pub fn draw(&self, img: &mut RgbaImage, rect: PixelRect) -> DecksnapResult<()> {
        self.ensure_fits(rect)?;
        fill_rect(img, rect, LIGHT);

        let module_px = self.module_px(rect.width.min(rect.height));
        let symbol = self.width as u32 * module_px;
        let offset_x = rect.x + rect.width.saturating_sub(symbol) / 2;
        let offset_y = rect.y + rect.height.saturating_sub(symbol) / 2;

        for my in 0..self.width {
            for mx in 0..self.width {
                if !self.is_dark(mx, my) {
                    continue;
                }
                let px = offset_x + mx as u32 * module_px;
                let py = offset_y + my as u32 * module_px;
                for dy in 0..module_px {
                    for dx in 0..module_px {
                        let (x, y) = (px + dx, py + dy);
                        if x < img.width() && y < img.height() {
                            img.put_pixel(x, y, DARK);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn fill_rect(img: &mut RgbaImage, rect: PixelRect, color: Rgba<u8>) {
    let x_end = rect.right().min(img.width());
    let y_end = rect.bottom().min(img.height());
    for y in rect.y..y_end {
        for x in rect.x..x_end {
            img.put_pixel(x, y, color);
        }
    }
}
