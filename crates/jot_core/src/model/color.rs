//! Note colors and their persisted text form.
//!
//! # Responsibility
//! - Define the RGB color carried by every note plus the stock palette.
//! - Serialize/parse the `"r,g,b"` field stored in the notes table.
//!
//! # Invariants
//! - Channels are `f32` values in `[0, 1]`.
//! - Parsing a malformed or out-of-range field yields the default color
//!   instead of an error; load paths never fail on color data.

use serde::{Deserialize, Serialize};

/// RGB color of a note, channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl NoteColor {
    /// Stock palette, channel values taken from 0-255 source colors.
    pub const GREEN: Self = Self::from_u8(195, 244, 190);
    pub const BLUE: Self = Self::from_u8(200, 230, 247);
    pub const YELLOW: Self = Self::from_u8(252, 250, 171);
    pub const PINK: Self = Self::from_u8(241, 194, 241);
    pub const PURPLE: Self = Self::from_u8(209, 200, 254);
    pub const WHITE: Self = Self::from_u8(244, 244, 244);

    /// Color given to new notes and substituted for unparseable fields.
    pub const DEFAULT: Self = Self::GREEN;

    const fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Full stock palette in display order.
    pub fn palette() -> [Self; 6] {
        [
            Self::YELLOW,
            Self::GREEN,
            Self::BLUE,
            Self::PINK,
            Self::PURPLE,
            Self::WHITE,
        ]
    }

    /// Renders the persisted `"r,g,b"` field value.
    pub fn to_field(self) -> String {
        format!("{},{},{}", self.r, self.g, self.b)
    }

    /// Parses a persisted `"r,g,b"` field value.
    ///
    /// Any malformed input (wrong arity, non-numeric, out-of-range channel)
    /// falls back to [`NoteColor::DEFAULT`].
    pub fn parse_field(value: &str) -> Self {
        match try_parse_field(value) {
            Some(color) => color,
            None => {
                log::warn!(
                    "event=color_parse module=model status=fallback value_len={}",
                    value.len()
                );
                Self::DEFAULT
            }
        }
    }
}

impl Default for NoteColor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn try_parse_field(value: &str) -> Option<NoteColor> {
    let mut parts = value.split(',');
    let r = parse_channel(parts.next()?)?;
    let g = parse_channel(parts.next()?)?;
    let b = parse_channel(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(NoteColor { r, g, b })
}

fn parse_channel(raw: &str) -> Option<f32> {
    let channel: f32 = raw.trim().parse().ok()?;
    if channel.is_finite() && (0.0..=1.0).contains(&channel) {
        Some(channel)
    } else {
        None
    }
}
