//! Output aspect ratio definitions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Aspect ratios accepted by clip providers and the timeline assembler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
pub enum AspectRatio {
    /// Vertical 9:16 for Reels/TikTok/Shorts
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    /// Horizontal 16:9
    #[serde(rename = "16:9")]
    Landscape,
    /// Square 1:1
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub const ALL: &'static [AspectRatio] = &[
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Square,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Square => "1:1",
        }
    }

    /// Output frame size in pixels (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            AspectRatio::Portrait => (1080, 1920),
            AspectRatio::Landscape => (1920, 1080),
            AspectRatio::Square => (1080, 1080),
        }
    }

    /// Returns the aspect ratio as a decimal.
    pub fn as_f64(&self) -> f64 {
        let (w, h) = self.dimensions();
        w as f64 / h as f64
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, AspectRatio::Portrait)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "9:16" | "portrait" | "vertical" => Ok(AspectRatio::Portrait),
            "16:9" | "landscape" | "horizontal" => Ok(AspectRatio::Landscape),
            "1:1" | "square" => Ok(AspectRatio::Square),
            _ => Err(AspectRatioParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unsupported aspect ratio: {0}, expected one of 9:16, 16:9, 1:1")]
pub struct AspectRatioParseError(String);
