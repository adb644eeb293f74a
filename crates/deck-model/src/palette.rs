//! Color variants and their fixed palettes.

use std::fmt;
use std::str::FromStr;

use decksnap_common::error::DecksnapError;
use serde::{Deserialize, Serialize};

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linearly interpolate between two colors, `t` clamped to `[0, 1]`.
    pub fn lerp(a: Color, b: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
        Color {
            r: mix(a.r, b.r),
            g: mix(a.g, b.g),
            b: mix(a.b, b.b),
        }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Every color a render needs from its variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Background gradient stop at the northeast corner.
    pub background_ne: Color,
    /// Background gradient stop at the southwest corner.
    pub background_sw: Color,
    /// Zone header bar stop at the east end.
    pub header_east: Color,
    /// Zone header bar stop at the west end.
    pub header_west: Color,
    pub border: Color,
    pub accent: Color,
    pub font: Color,
}

/// The closed set of color variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorVariant {
    #[default]
    Classic,
    Midnight,
    Crimson,
    Verdant,
    Aurum,
}

impl ColorVariant {
    pub const ALL: [ColorVariant; 5] = [
        ColorVariant::Classic,
        ColorVariant::Midnight,
        ColorVariant::Crimson,
        ColorVariant::Verdant,
        ColorVariant::Aurum,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorVariant::Classic => "classic",
            ColorVariant::Midnight => "midnight",
            ColorVariant::Crimson => "crimson",
            ColorVariant::Verdant => "verdant",
            ColorVariant::Aurum => "aurum",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ColorVariant::Classic => Palette {
                background_ne: Color::rgb(0x3a, 0x5f, 0x8f),
                background_sw: Color::rgb(0x12, 0x1d, 0x33),
                header_east: Color::rgb(0x24, 0x3b, 0x5e),
                header_west: Color::rgb(0x5b, 0x8d, 0xc9),
                border: Color::rgb(0x0b, 0x12, 0x1f),
                accent: Color::rgb(0xf2, 0xb7, 0x05),
                font: Color::rgb(0xf5, 0xf7, 0xfa),
            },
            ColorVariant::Midnight => Palette {
                background_ne: Color::rgb(0x2b, 0x2d, 0x42),
                background_sw: Color::rgb(0x08, 0x08, 0x10),
                header_east: Color::rgb(0x1a, 0x1b, 0x2e),
                header_west: Color::rgb(0x4a, 0x4e, 0x8c),
                border: Color::rgb(0x00, 0x00, 0x00),
                accent: Color::rgb(0x8d, 0x99, 0xff),
                font: Color::rgb(0xe6, 0xe6, 0xf0),
            },
            ColorVariant::Crimson => Palette {
                background_ne: Color::rgb(0x8c, 0x1c, 0x2b),
                background_sw: Color::rgb(0x2a, 0x06, 0x0c),
                header_east: Color::rgb(0x5c, 0x0f, 0x1b),
                header_west: Color::rgb(0xc4, 0x3a, 0x4c),
                border: Color::rgb(0x1a, 0x03, 0x07),
                accent: Color::rgb(0xff, 0xd1, 0x66),
                font: Color::rgb(0xff, 0xf4, 0xf0),
            },
            ColorVariant::Verdant => Palette {
                background_ne: Color::rgb(0x2e, 0x7d, 0x4f),
                background_sw: Color::rgb(0x0b, 0x2b, 0x1a),
                header_east: Color::rgb(0x1c, 0x4d, 0x31),
                header_west: Color::rgb(0x4c, 0xb0, 0x76),
                border: Color::rgb(0x05, 0x17, 0x0d),
                accent: Color::rgb(0xe0, 0xf2, 0x6b),
                font: Color::rgb(0xf0, 0xfa, 0xf3),
            },
            ColorVariant::Aurum => Palette {
                background_ne: Color::rgb(0xb8, 0x86, 0x2b),
                background_sw: Color::rgb(0x3d, 0x2a, 0x08),
                header_east: Color::rgb(0x6e, 0x4e, 0x12),
                header_west: Color::rgb(0xd9, 0xa8, 0x42),
                border: Color::rgb(0x21, 0x16, 0x03),
                accent: Color::rgb(0xff, 0xf1, 0xc1),
                font: Color::rgb(0xff, 0xfb, 0xef),
            },
        }
    }
}

impl fmt::Display for ColorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorVariant {
    type Err = DecksnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ColorVariant::ALL
            .into_iter()
            .find(|variant| variant.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                DecksnapError::invalid_request(format!(
                    "Unsupported color variant: {wanted:?}. Use: classic, midnight, crimson, verdant, aurum"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_names_round_trip() {
        for variant in ColorVariant::ALL {
            assert_eq!(variant.name().parse::<ColorVariant>().unwrap(), variant);
        }
        assert_eq!("MIDNIGHT".parse::<ColorVariant>().unwrap(), ColorVariant::Midnight);
    }

    #[test]
    fn test_unknown_variant_is_invalid_request() {
        let err = "neon".parse::<ColorVariant>().unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_unknown_variant_rejected_by_serde() {
        assert!(serde_json::from_str::<ColorVariant>("\"neon\"").is_err());
        assert_eq!(
            serde_json::from_str::<ColorVariant>("\"verdant\"").unwrap(),
            ColorVariant::Verdant
        );
    }

    #[test]
    fn test_color_lerp_endpoints() {
        let a = Color::rgb(0, 100, 200);
        let b = Color::rgb(200, 100, 0);
        assert_eq!(Color::lerp(a, b, 0.0), a);
        assert_eq!(Color::lerp(a, b, 1.0), b);
        assert_eq!(Color::lerp(a, b, 0.5), Color::rgb(100, 100, 100));
        assert_eq!(Color::lerp(a, b, 7.0), b);
    }
}
