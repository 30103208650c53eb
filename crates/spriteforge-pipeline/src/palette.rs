//! Reference palettes and the RGB color type they are built from.
//!
//! A [`Palette`] is an ordered, non-empty list of named colors. Order only
//! matters for tie-breaking: when two entries are equally close to a
//! pixel, the one declared first wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// An 8-bit RGB color (no alpha).
///
/// Serializes as a `[r, g, b]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The color channels of an RGBA pixel.
    #[must_use]
    pub const fn of(pixel: image::Rgba<u8>) -> Self {
        let [r, g, b, _] = pixel.0;
        Self { r, g, b }
    }

    /// This color as an RGBA pixel with the given alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, alpha])
    }

    /// Squared Euclidean distance in RGB space.
    ///
    /// Ranks identically to the true distance without the square root.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        dr.unsigned_abs().pow(2) + dg.unsigned_abs().pow(2) + db.unsigned_abs().pow(2)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(color: Rgb) -> Self {
        [color.r, color.g, color.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Error parsing an [`Rgb`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected '#rrggbb' or 'r,g,b'")]
pub struct ParseRgbError(String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    /// Accepts `#rrggbb` or `r,g,b` (decimal, whitespace allowed).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRgbError(s.to_string());
        let trimmed = s.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(err());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            return Ok(Self::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let mut parts = trimmed.split(',').map(|p| p.trim().parse::<u8>());
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(r)), Some(Ok(g)), Some(Ok(b)), None) => Ok(Self::new(r, g, b)),
            _ => Err(err()),
        }
    }
}

/// A single named palette color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// Human-readable name (e.g. `"brown_dark"`).
    pub name: String,
    /// The reference color.
    pub rgb: Rgb,
}

impl PaletteEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(name: impl Into<String>, rgb: Rgb) -> Self {
        Self {
            name: name.into(),
            rgb,
        }
    }
}

/// An ordered, non-empty set of reference colors.
///
/// Deserialization enforces the non-empty invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPalette")]
pub struct Palette {
    name: String,
    colors: Vec<PaletteEntry>,
}

/// Unvalidated palette as it appears on the wire.
#[derive(Deserialize)]
struct RawPalette {
    name: String,
    colors: Vec<PaletteEntry>,
}

impl TryFrom<RawPalette> for Palette {
    type Error = PipelineError;

    fn try_from(raw: RawPalette) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.colors)
    }
}

impl Palette {
    /// Name of the built-in palette.
    pub const EARTHY_NAME: &str = "earthy";

    /// Create a palette from its entries.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] if `colors` is empty.
    pub fn new(name: impl Into<String>, colors: Vec<PaletteEntry>) -> Result<Self, PipelineError> {
        let name = name.into();
        if colors.is_empty() {
            return Err(PipelineError::Dimension(format!(
                "palette '{name}' has no colors"
            )));
        }
        Ok(Self { name, colors })
    }

    /// The built-in 13-color palette of muted earthy tones.
    #[must_use]
    pub fn earthy() -> Self {
        let colors = [
            ("brown_dark", Rgb::new(101, 67, 33)),
            ("brown_medium", Rgb::new(139, 105, 20)),
            ("brown_light", Rgb::new(212, 175, 55)),
            ("green_dark", Rgb::new(46, 80, 22)),
            ("green_grass", Rgb::new(58, 125, 47)),
            ("green_bright", Rgb::new(74, 157, 63)),
            ("gray_dark", Rgb::new(74, 74, 74)),
            ("gray_medium", Rgb::new(139, 119, 101)),
            ("gray_light", Rgb::new(230, 225, 217)),
            ("red_dark", Rgb::new(139, 0, 0)),
            ("red_bright", Rgb::new(255, 68, 68)),
            ("blue_water", Rgb::new(30, 77, 155)),
            ("blue_ice", Rgb::new(135, 206, 235)),
        ];
        Self {
            name: Self::EARTHY_NAME.to_string(),
            colors: colors
                .into_iter()
                .map(|(name, rgb)| PaletteEntry::new(name, rgb))
                .collect(),
        }
    }

    /// Palette name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[PaletteEntry] {
        &self.colors
    }

    /// Number of entries (always at least one).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always `false`; provided for API symmetry with [`len`](Self::len).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Whether `color` is exactly one of the entries.
    #[must_use]
    pub fn contains(&self, color: Rgb) -> bool {
        self.colors.iter().any(|e| e.rgb == color)
    }

    /// A palette holding only the first `limit` entries.
    ///
    /// A limit at or above [`len`](Self::len) keeps every entry.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Dimension`] if `limit` is zero.
    pub fn truncated(&self, limit: usize) -> Result<Self, PipelineError> {
        let kept = self.colors.iter().take(limit).cloned().collect();
        Self::new(self.name.clone(), kept)
    }

    /// Index of the entry closest to `color`.
    ///
    /// Ties go to the earliest entry. The scan stops at the first exact
    /// match.
    #[must_use]
    pub fn nearest_index(&self, color: Rgb) -> usize {
        let mut best = 0;
        let mut best_distance = u32::MAX;
        for (i, entry) in self.colors.iter().enumerate() {
            let d = color.distance_squared(entry.rgb);
            if d < best_distance {
                best = i;
                best_distance = d;
                if d == 0 {
                    break;
                }
            }
        }
        best
    }

    /// The entry color closest to `color`.
    #[must_use]
    pub fn nearest(&self, color: Rgb) -> Rgb {
        self.colors[self.nearest_index(color)].rgb
    }
}
