//! Segment normalization: bring a raw provider clip to its planned duration.
//!
//! Three strategies, tried in this order:
//!
//! | condition | method | re-encode |
//! |---|---|---|
//! | `|target - raw| <= 0.1s` | copy | no |
//! | `target / raw` within 0.1 of an integer `n >= 2` | loop via concat demuxer, cut to target | no |
//! | otherwise | `setpts` rescale by `target / raw` | yes |
//!
//! An encoder failure does not abort the run. The segment is marked
//! degraded and its raw clip is used as-is.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use adreel_models::{EncodingConfig, NormalizationMethod, Segment};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_if_exists;
use crate::metrics;
use crate::pool::EncoderPool;

/// Raw clips this close to their target are copied unchanged.
pub const COPY_TOLERANCE_SECS: f64 = 0.1;

/// How close the target/raw ratio must be to an integer to loop.
pub const LOOP_RATIO_TOLERANCE: f64 = 0.1;

/// Pick a normalization method for a raw clip.
pub fn choose_method(raw_duration: f64, target_duration: f64) -> MediaResult<NormalizationMethod> {
    if !raw_duration.is_finite() || raw_duration <= 0.0 {
        return Err(MediaError::invalid_input(format!(
            "raw clip duration must be positive, got {}",
            raw_duration
        )));
    }
    if !target_duration.is_finite() || target_duration <= 0.0 {
        return Err(MediaError::invalid_input(format!(
            "target duration must be positive, got {}",
            target_duration
        )));
    }

    if (target_duration - raw_duration).abs() <= COPY_TOLERANCE_SECS {
        return Ok(NormalizationMethod::Copy);
    }

    let ratio = target_duration / raw_duration;
    let nearest = ratio.round();
    if nearest >= 2.0 && (ratio - nearest).abs() <= LOOP_RATIO_TOLERANCE {
        return Ok(NormalizationMethod::Loop {
            count: loop_play_count(ratio),
        });
    }

    Ok(NormalizationMethod::Rescale { factor: ratio })
}

/// Plays needed to cover `ratio` raw lengths.
///
/// Rounds up so the concat output is never shorter than the target; `-t`
/// cuts the excess.
fn loop_play_count(ratio: f64) -> u32 {
    (ratio - 1e-9).ceil().max(1.0) as u32
}

/// Concat demuxer list that plays `clip` `count` times.
pub fn loop_concat_list(clip: &Path, count: u32) -> String {
    let entry = format!("file '{}'\n", escape_concat_path(clip));
    entry.repeat(count as usize)
}

/// Concat demuxer list for clips in playback order.
pub fn concat_list<P: AsRef<Path>>(clips: &[P]) -> String {
    clips
        .iter()
        .map(|clip| format!("file '{}'\n", escape_concat_path(clip.as_ref())))
        .collect()
}

/// Quote a path for a concat list entry.
fn escape_concat_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

/// `setpts` filter that stretches (factor > 1) or compresses a clip.
pub fn rescale_filter(factor: f64) -> String {
    format!("setpts={:.6}*PTS", factor)
}

/// Normalizes raw segment clips through the shared encoder pool.
#[derive(Debug, Clone)]
pub struct SegmentNormalizer {
    pool: EncoderPool,
    encoding: EncodingConfig,
    frame_rate: u32,
}

impl SegmentNormalizer {
    pub fn new(pool: EncoderPool, encoding: EncodingConfig, frame_rate: u32) -> Self {
        Self {
            pool,
            encoding,
            frame_rate,
        }
    }

    /// Normalized clip path for a segment inside `work_dir`.
    pub fn output_path(work_dir: &Path, order: usize) -> PathBuf {
        work_dir.join(format!("segment_{:02}_normalized.mp4", order))
    }

    /// Normalize one segment in place.
    ///
    /// Returns an error only when the segment has no raw clip or unusable
    /// durations. Encoder failures degrade the segment instead.
    pub async fn normalize(&self, segment: &mut Segment, work_dir: &Path) -> MediaResult<()> {
        let order = segment.order();
        let raw_path = segment
            .raw_clip_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                MediaError::invalid_input(format!("segment {} has no raw clip", order))
            })?;
        let raw_duration = segment.raw_clip_duration().ok_or_else(|| {
            MediaError::invalid_input(format!("segment {} has no raw clip duration", order))
        })?;
        let target = segment.target_duration();

        let method = choose_method(raw_duration, target)?;
        let output = Self::output_path(work_dir, order);

        info!(
            segment = order,
            method = method.as_str(),
            raw_duration = raw_duration,
            target_duration = target,
            "Normalizing segment"
        );

        match self.apply(method, &raw_path, target, &output, work_dir, order).await {
            Ok(()) => {
                segment.attach_normalized(&output, method);
                Ok(())
            }
            Err(e) => {
                let reason = e.summary();
                warn!(
                    segment = order,
                    method = method.as_str(),
                    "Normalization failed, using raw clip: {}",
                    reason
                );
                metrics::record_degraded(method.as_str());
                let _ = remove_if_exists(&output).await;
                segment.mark_degraded(method, reason);
                Ok(())
            }
        }
    }

    async fn apply(
        &self,
        method: NormalizationMethod,
        raw: &Path,
        target: f64,
        output: &Path,
        work_dir: &Path,
        order: usize,
    ) -> MediaResult<()> {
        match method {
            NormalizationMethod::Copy => {
                tokio::fs::copy(raw, output).await?;
                Ok(())
            }
            NormalizationMethod::Loop { count } => {
                let list_path = work_dir.join(format!("segment_{:02}_loop.txt", order));
                tokio::fs::write(&list_path, loop_concat_list(raw, count)).await?;

                let cmd = FfmpegCommand::new(&list_path, output)
                    .concat_list()
                    .codec_copy()
                    .no_audio()
                    .duration(target);

                let result = self.pool.run("normalize", &cmd).await;
                let _ = remove_if_exists(&list_path).await;
                result
            }
            NormalizationMethod::Rescale { factor } => {
                let cmd = FfmpegCommand::new(raw, output)
                    .video_filter(rescale_filter(factor))
                    .frame_rate(self.frame_rate)
                    .no_audio()
                    .video_encoding(&self.encoding)
                    .duration(target);

                self.pool.run("normalize", &cmd).await
            }
        }
    }
}
