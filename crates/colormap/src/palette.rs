//! Palettes and evenly spaced multi-stop interpolation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("unknown palette: {0}")]
    Unknown(String),
}

/// Color ramps used by the index layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Palette {
    /// Red -> Yellow -> Green
    RdYlGn,
    /// Red -> White -> Blue
    RdBu,
    /// Blue -> White -> Red
    #[serde(rename = "RdBu_r")]
    RdBuR,
    /// Yellow -> Green -> Blue
    YlGnBu,
    /// White -> Green
    Greens,
    /// Yellow -> Green
    YlGn,
    /// Black -> White
    #[serde(rename = "gray")]
    Gray,
}

impl Palette {
    pub const ALL: &[Palette] = &[
        Self::RdYlGn,
        Self::RdBu,
        Self::RdBuR,
        Self::YlGnBu,
        Self::Greens,
        Self::YlGn,
        Self::Gray,
    ];

    /// Matplotlib-style name
    pub fn name(&self) -> &'static str {
        match self {
            Self::RdYlGn => "RdYlGn",
            Self::RdBu => "RdBu",
            Self::RdBuR => "RdBu_r",
            Self::YlGnBu => "YlGnBu",
            Self::Greens => "Greens",
            Self::YlGn => "YlGn",
            Self::Gray => "gray",
        }
    }

    /// Evenly spaced stops from `t = 0` to `t = 1`
    pub fn stops(&self) -> Vec<Rgb> {
        match self {
            Self::RdYlGn => RDYLGN.to_vec(),
            Self::RdBu => RDBU.to_vec(),
            Self::RdBuR => RDBU.iter().rev().copied().collect(),
            Self::YlGnBu => YLGNBU.to_vec(),
            Self::Greens => GREENS.to_vec(),
            Self::YlGn => YLGN.to_vec(),
            Self::Gray => vec![Rgb::new(0, 0, 0), Rgb::new(255, 255, 255)],
        }
    }

    /// Stops as `#rrggbb` strings, the form web map widgets accept
    pub fn hex_colors(&self) -> Vec<String> {
        self.stops().into_iter().map(Rgb::to_hex).collect()
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Palette {
    type Err = PaletteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Palette::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PaletteError::Unknown(s.to_string()))
    }
}

// ─── ColorBrewer stops ────────────────────────────────────────────────

const RDYLGN: &[Rgb] = &[
    Rgb::new(165, 0, 38),
    Rgb::new(215, 48, 39),
    Rgb::new(244, 109, 67),
    Rgb::new(253, 174, 97),
    Rgb::new(254, 224, 139),
    Rgb::new(255, 255, 191),
    Rgb::new(217, 239, 139),
    Rgb::new(166, 217, 106),
    Rgb::new(102, 189, 99),
    Rgb::new(26, 152, 80),
    Rgb::new(0, 104, 55),
];

const RDBU: &[Rgb] = &[
    Rgb::new(103, 0, 31),
    Rgb::new(178, 24, 43),
    Rgb::new(214, 96, 77),
    Rgb::new(244, 165, 130),
    Rgb::new(253, 219, 199),
    Rgb::new(247, 247, 247),
    Rgb::new(209, 229, 240),
    Rgb::new(146, 197, 222),
    Rgb::new(67, 147, 195),
    Rgb::new(33, 102, 172),
    Rgb::new(5, 48, 97),
];

const YLGNBU: &[Rgb] = &[
    Rgb::new(255, 255, 217),
    Rgb::new(237, 248, 177),
    Rgb::new(199, 233, 180),
    Rgb::new(127, 205, 187),
    Rgb::new(65, 182, 196),
    Rgb::new(29, 145, 192),
    Rgb::new(34, 94, 168),
    Rgb::new(37, 52, 148),
    Rgb::new(8, 29, 88),
];

const GREENS: &[Rgb] = &[
    Rgb::new(247, 252, 245),
    Rgb::new(229, 245, 224),
    Rgb::new(199, 233, 192),
    Rgb::new(161, 217, 155),
    Rgb::new(116, 196, 118),
    Rgb::new(65, 171, 93),
    Rgb::new(35, 139, 69),
    Rgb::new(0, 109, 44),
    Rgb::new(0, 68, 27),
];

const YLGN: &[Rgb] = &[
    Rgb::new(255, 255, 229),
    Rgb::new(247, 252, 185),
    Rgb::new(217, 240, 163),
    Rgb::new(173, 221, 142),
    Rgb::new(120, 198, 121),
    Rgb::new(65, 171, 93),
    Rgb::new(35, 132, 67),
    Rgb::new(0, 104, 55),
    Rgb::new(0, 69, 41),
];

// ─── Interpolation engine ──────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn even_stops(stops: &[Rgb], t: f64) -> Rgb {
    let last = stops.len() - 1;
    if t <= 0.0 {
        return stops[0];
    }
    if t >= 1.0 {
        return stops[last];
    }
    let pos = t * last as f64;
    let i = (pos.floor() as usize).min(last - 1);
    lerp_color(stops[i], stops[i + 1], pos - i as f64)
}

/// Evaluate a palette at normalized position `t` ∈ [0, 1], clamping outside.
pub fn evaluate(palette: Palette, t: f64) -> Rgb {
    match palette {
        Palette::RdYlGn => even_stops(RDYLGN, t),
        Palette::RdBu => even_stops(RDBU, t),
        Palette::RdBuR => even_stops(RDBU, 1.0 - t),
        Palette::YlGnBu => even_stops(YLGNBU, t),
        Palette::Greens => even_stops(GREENS, t),
        Palette::YlGn => even_stops(YLGN, t),
        Palette::Gray => {
            let v = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
            Rgb::new(v, v, v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rdylgn_endpoints() {
        assert_eq!(evaluate(Palette::RdYlGn, 0.0), Rgb::new(165, 0, 38));
        assert_eq!(evaluate(Palette::RdYlGn, 1.0), Rgb::new(0, 104, 55));
        assert_eq!(evaluate(Palette::RdYlGn, 0.5), Rgb::new(255, 255, 191));
    }

    #[test]
    fn reversed_palette_mirrors() {
        for t in [0.0, 0.13, 0.5, 0.77, 1.0] {
            assert_eq!(evaluate(Palette::RdBuR, t), evaluate(Palette::RdBu, 1.0 - t));
        }
        assert_eq!(Palette::RdBuR.stops()[0], Rgb::new(5, 48, 97));
    }

    #[test]
    fn gray_midpoint() {
        assert_eq!(evaluate(Palette::Gray, 0.5), Rgb::new(128, 128, 128));
    }

    #[test]
    fn interpolates_between_stops() {
        // Halfway between the first two Greens stops
        assert_eq!(evaluate(Palette::Greens, 0.0625), Rgb::new(238, 249, 235));
    }

    #[test]
    fn clamps_outside_unit_interval() {
        assert_eq!(evaluate(Palette::YlGn, -0.5), Rgb::new(255, 255, 229));
        assert_eq!(evaluate(Palette::YlGn, 1.5), Rgb::new(0, 69, 41));
    }

    #[test]
    fn names_round_trip() {
        for &p in Palette::ALL {
            assert_eq!(p.name().parse::<Palette>().unwrap(), p);
        }
        assert!("viridis".parse::<Palette>().is_err());
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Palette::Gray.hex_colors(), vec!["#000000", "#ffffff"]);
        assert_eq!(Palette::YlGnBu.hex_colors().len(), 9);
    }
}
