use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Straight (non-premultiplied) RGBA, each channel in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ColorError {
    #[error("color channel '{0}' must be between 0 and 1")]
    OutOfRange(&'static str),
    #[error("malformed color '{0}', expected #RRGGBB, #RRGGBBAA or r,g,b,a")]
    Malformed(String),
}

impl Color {
    pub fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Result<Self, ColorError> {
        for (name, val) in [
            ("red", red),
            ("green", green),
            ("blue", blue),
            ("alpha", alpha),
        ] {
            if !(0.0..=1.0).contains(&val) {
                return Err(ColorError::OutOfRange(name));
            }
        }
        Ok(Self {
            red,
            green,
            blue,
            alpha,
        })
    }

    /// Packs into a 32-bit ARGB pixel as used by a depth-32 TrueColor visual.
    pub fn to_argb32(self) -> u32 {
        let ch = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (ch(self.alpha) << 24) | (ch(self.red) << 16) | (ch(self.green) << 8) | ch(self.blue)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let digits_only = hex.bytes().all(|b| b.is_ascii_hexdigit());
        if !digits_only || !(hex.len() == 6 || hex.len() == 8) {
            return None;
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .ok()
                .map(|b| f32::from(b) / 255.0)
        };
        Some(Self {
            red: byte(0)?,
            green: byte(2)?,
            blue: byte(4)?,
            alpha: if hex.len() == 8 { byte(6)? } else { 1.0 },
        })
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex).ok_or_else(|| ColorError::Malformed(s.to_string()));
        }

        let parts: Vec<f32> = s
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|_| ColorError::Malformed(s.to_string()))?;

        match parts[..] {
            [r, g, b, a] => Self::new(r, g, b, a),
            [r, g, b] => Self::new(r, g, b, 1.0),
            _ => Err(ColorError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            red,
            green,
            blue,
            alpha,
        } = self;
        write!(f, "{red},{green},{blue},{alpha}")
    }
}
