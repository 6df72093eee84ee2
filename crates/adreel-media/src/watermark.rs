//! Watermark overlay applied during the final mux.
//!
//! The overlay image is fed to FFmpeg as an extra input and composited onto
//! the video in the same encode that adds the voiceover.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Configuration for watermark overlay.
///
/// ```ignore
/// let config = WatermarkConfig::new("brand.png")
///     .with_offset(30, 30)
///     .with_opacity(0.8);
/// ```
#[derive(Debug, Clone)]
pub struct WatermarkConfig {
    /// PNG with transparency
    pub image_path: PathBuf,
    /// Horizontal offset from right edge (pixels)
    pub offset_x: u32,
    /// Vertical offset from bottom edge (pixels)
    pub offset_y: u32,
    /// Opacity (0.0 to 1.0)
    pub opacity: f32,
}

impl WatermarkConfig {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            offset_x: 20,
            offset_y: 20,
            opacity: 0.7,
        }
    }

    /// Set offset from bottom-right corner.
    pub fn with_offset(mut self, x: u32, y: u32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    /// Set watermark opacity (0.0 = invisible, 1.0 = fully opaque).
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Check if the watermark image exists.
    pub fn is_available(&self) -> bool {
        self.image_path.exists()
    }

    pub fn validate(&self) -> MediaResult<()> {
        if !self.is_available() {
            return Err(MediaError::FileNotFound(self.image_path.clone()));
        }
        Ok(())
    }
}

/// Build the overlay filter graph.
///
/// `video_label` is the base video stream, `watermark_input` the input index
/// of the watermark image. The composited stream is emitted as `[output_label]`.
pub fn build_overlay_filter(
    config: &WatermarkConfig,
    video_label: &str,
    watermark_input: usize,
    output_label: &str,
) -> String {
    // W-w-X / H-h-Y anchor the overlay X,Y pixels from the bottom-right corner
    if config.opacity < 1.0 {
        format!(
            "[{wm}:v]format=rgba,colorchannelmixer=aa={opacity:.2}[wm];[{base}][wm]overlay=W-w-{x}:H-h-{y}:format=auto[{out}]",
            wm = watermark_input,
            opacity = config.opacity,
            base = video_label,
            x = config.offset_x,
            y = config.offset_y,
            out = output_label,
        )
    } else {
        format!(
            "[{base}][{wm}:v]overlay=W-w-{x}:H-h-{y}:format=auto[{out}]",
            base = video_label,
            wm = watermark_input,
            x = config.offset_x,
            y = config.offset_y,
            out = output_label,
        )
    }
}
