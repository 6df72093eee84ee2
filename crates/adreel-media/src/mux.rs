//! Final mux: silent video + voiceover (+ optional watermark).
//!
//! Voiceover length is not tied to the video length, so the output stops at
//! the shorter stream.

use std::path::Path;

use tracing::{debug, info};

use adreel_models::EncodingConfig;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::pool::EncoderPool;
use crate::watermark::{build_overlay_filter, WatermarkConfig};

/// Input index of the watermark image in the mux command.
const WATERMARK_INPUT: usize = 2;

/// Merges the assembled video with its voiceover.
#[derive(Debug, Clone)]
pub struct AudioMuxer {
    pool: EncoderPool,
    encoding: EncodingConfig,
    watermark: Option<WatermarkConfig>,
}

impl AudioMuxer {
    pub fn new(pool: EncoderPool, encoding: EncodingConfig) -> Self {
        Self {
            pool,
            encoding,
            watermark: None,
        }
    }

    /// Composite `watermark` in the bottom-right corner during the mux.
    pub fn with_watermark(mut self, watermark: WatermarkConfig) -> Self {
        self.watermark = Some(watermark);
        self
    }

    /// Build the mux command.
    ///
    /// Without a usable watermark the video stream is copied untouched.
    pub fn build_command(&self, video: &Path, audio: &Path, output: &Path) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(video, output).input(audio);

        let cmd = match self.watermark.as_ref().filter(|w| w.is_available()) {
            Some(watermark) => cmd
                .input(watermark.image_path())
                .filter_complex(build_overlay_filter(watermark, "0:v", WATERMARK_INPUT, "vout"))
                .map("[vout]")
                .map("1:a:0")
                .video_encoding(&self.encoding),
            None => cmd.map("0:v:0").map("1:a:0").video_codec("copy"),
        };

        cmd.audio_encoding(&self.encoding).shortest().faststart()
    }

    /// Mux `video` and `audio` into `output`.
    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> MediaResult<()> {
        if let Some(watermark) = &self.watermark {
            if !watermark.is_available() {
                debug!(
                    watermark = %watermark.image_path().display(),
                    "Skipping watermark: image not found"
                );
            }
        }

        let cmd = self.build_command(video, audio, output);
        info!(
            video = %video.display(),
            audio = %audio.display(),
            watermark = cmd.input_count() > 2,
            "Muxing voiceover"
        );

        self.pool.run("mux", &cmd).await
    }
}
