//! Named color gradients and their 256-entry lookup tables.

use field_common::FieldError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of entries in a lookup table.
pub const LUT_SIZE: usize = 256;

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Parse hex color string (e.g., "#FF0000" or "FF0000") to RGB.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Linear blend between two colors; channels are truncated, not rounded.
fn interpolate_color(c1: Color, c2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 * (1.0 - t) + b as f64 * t) as u8;
    Color::new(mix(c1.r, c2.r), mix(c1.g, c2.g), mix(c1.b, c2.b), mix(c1.a, c2.a))
}

/// Registered colormaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Viridis,
    Plasma,
    Inferno,
    Magma,
    Coolwarm,
    Jet,
}

impl Colormap {
    pub const ALL: [Colormap; 6] = [
        Colormap::Viridis,
        Colormap::Plasma,
        Colormap::Inferno,
        Colormap::Magma,
        Colormap::Coolwarm,
        Colormap::Jet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
            Colormap::Inferno => "inferno",
            Colormap::Magma => "magma",
            Colormap::Coolwarm => "coolwarm",
            Colormap::Jet => "jet",
        }
    }

    /// Gradient stops as (position in [0, 1], hex color).
    pub fn stops(&self) -> &'static [(f64, &'static str)] {
        match self {
            Colormap::Viridis => &[
                (0.0, "#440154"),
                (0.25, "#3b528b"),
                (0.5, "#21918c"),
                (0.75, "#5ec962"),
                (1.0, "#fde725"),
            ],
            Colormap::Plasma => &[
                (0.0, "#0d0887"),
                (0.25, "#7e03a8"),
                (0.5, "#cc4778"),
                (0.75, "#f89540"),
                (1.0, "#f0f921"),
            ],
            Colormap::Inferno => &[
                (0.0, "#000004"),
                (0.25, "#57106e"),
                (0.5, "#bb3754"),
                (0.75, "#f98e09"),
                (1.0, "#fcffa4"),
            ],
            Colormap::Magma => &[
                (0.0, "#000004"),
                (0.25, "#51127c"),
                (0.5, "#b73779"),
                (0.75, "#fc8961"),
                (1.0, "#fcfdbf"),
            ],
            Colormap::Coolwarm => &[(0.0, "#3b4cc0"), (0.5, "#dddddd"), (1.0, "#b40426")],
            Colormap::Jet => &[
                (0.0, "#000080"),
                (0.125, "#0000ff"),
                (0.375, "#00ffff"),
                (0.625, "#ffff00"),
                (0.875, "#ff0000"),
                (1.0, "#800000"),
            ],
        }
    }

    /// Build the lookup table for this colormap.
    pub fn lut(&self) -> ColorLut {
        let stops: Vec<(f64, Color)> = self
            .stops()
            .iter()
            .filter_map(|(pos, hex)| hex_to_rgb(hex).map(|(r, g, b)| (*pos, Color::opaque(r, g, b))))
            .collect();
        ColorLut::from_stops(&stops)
    }
}

impl FromStr for Colormap {
    type Err = FieldError;

    /// Parse from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Colormap::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| FieldError::UnknownColormap(s.to_string()))
    }
}

impl std::fmt::Display for Colormap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A colormap discretized to [`LUT_SIZE`] entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorLut {
    entries: Vec<Color>,
}

impl ColorLut {
    /// Sample the gradient defined by sorted `stops` at `i / 255`.
    ///
    /// Positions before the first or after the last stop take that stop's color.
    pub fn from_stops(stops: &[(f64, Color)]) -> Self {
        let entries = (0..LUT_SIZE)
            .map(|i| {
                let val = i as f64 / (LUT_SIZE - 1) as f64;
                match stops {
                    [] => Color::transparent(),
                    [(_, only)] => *only,
                    _ => {
                        let upper = stops
                            .iter()
                            .position(|(pos, _)| *pos >= val)
                            .unwrap_or(stops.len() - 1)
                            .max(1);
                        let (p0, c0) = stops[upper - 1];
                        let (p1, c1) = stops[upper];
                        let span = p1 - p0;
                        let t = if span > 0.0 { (val - p0) / span } else { 0.0 };
                        interpolate_color(c0, c1, t)
                    }
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[Color] {
        &self.entries
    }

    /// Entry for a ratio in [0, 1]; out-of-range ratios are clamped.
    #[inline]
    pub fn index_of(&self, ratio: f64) -> usize {
        let scaled = (ratio * (LUT_SIZE - 1) as f64).clamp(0.0, (LUT_SIZE - 1) as f64);
        scaled as usize
    }

    #[inline]
    pub fn map(&self, ratio: f64) -> Color {
        self.entries[self.index_of(ratio)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_rgb() {
        assert_eq!(hex_to_rgb("#FF0000"), Some((255, 0, 0)));
        assert_eq!(hex_to_rgb("21918c"), Some((0x21, 0x91, 0x8c)));
        assert_eq!(hex_to_rgb("#FFF"), None);
        assert_eq!(hex_to_rgb("#GG0000"), None);
    }

    #[test]
    fn test_lut_endpoints_match_stops() {
        for cmap in Colormap::ALL {
            let lut = cmap.lut();
            let stops = cmap.stops();
            let first = hex_to_rgb(stops[0].1).unwrap();
            let last = hex_to_rgb(stops[stops.len() - 1].1).unwrap();
            assert_eq!(lut.entries().len(), LUT_SIZE);
            assert_eq!(lut.map(0.0), Color::opaque(first.0, first.1, first.2));
            assert_eq!(lut.map(1.0), Color::opaque(last.0, last.1, last.2));
        }
    }

    #[test]
    fn test_index_clamps() {
        let lut = Colormap::Jet.lut();
        assert_eq!(lut.index_of(-3.0), 0);
        assert_eq!(lut.index_of(0.5), 127);
        assert_eq!(lut.index_of(7.0), 255);
    }

    #[test]
    fn test_colormap_from_str() {
        assert_eq!("Viridis".parse::<Colormap>().unwrap(), Colormap::Viridis);
        assert_eq!(" coolwarm ".parse::<Colormap>().unwrap(), Colormap::Coolwarm);
        assert!(matches!(
            "rainbow".parse::<Colormap>(),
            Err(FieldError::UnknownColormap(_))
        ));
    }
}
