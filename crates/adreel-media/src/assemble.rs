//! Timeline assembly: join normalized segments into one silent video.
//!
//! With transitions every input is conformed to the output geometry and
//! frame rate, trimmed to its effective duration and chained through
//! `xfade` at cumulative offsets. Without transitions the clips are joined
//! losslessly by the concat demuxer when they already share the output
//! geometry, codec and frame rate; mixed inputs go through the same conform
//! chain and the `concat` filter instead.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use adreel_models::{EncodingConfig, Timeline};

use crate::command::FfmpegCommand;
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::remove_if_exists;
use crate::normalize::concat_list;
use crate::pool::EncoderPool;
use crate::probe::{get_duration, probe_media, VideoStreamInfo};

/// Drift between expected and probed length that gets reported.
pub const DURATION_DRIFT_TOLERANCE: f64 = 0.1;

/// Output label of the final filter chain.
const VIDEO_OUT_LABEL: &str = "vout";

/// Result of a successful assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledVideo {
    pub path: PathBuf,
    /// `sum(d) - (n - 1) * t`, or `sum(d)` without transitions
    pub expected_duration: f64,
    /// Probed length, if the probe succeeded
    pub measured_duration: Option<f64>,
}

impl AssembledVideo {
    /// Probed minus expected, when measured.
    pub fn drift(&self) -> Option<f64> {
        self.measured_duration
            .map(|measured| measured - self.expected_duration)
    }

    pub fn exceeds_tolerance(&self) -> bool {
        self.drift()
            .is_some_and(|d| d.abs() > DURATION_DRIFT_TOLERANCE)
    }
}

/// Per-input conform chain: fit inside the frame, pad, fix rate and format.
fn conform_chain(input: usize, width: u32, height: u32, fps: u32, duration: f64) -> String {
    format!(
        "[{input}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p,\
         trim=duration={duration:.3},setpts=PTS-STARTPTS,settb=AVTB[v{input}]",
        input = input,
        w = width,
        h = height,
        fps = fps,
        duration = duration,
    )
}

/// Build the `xfade` filter graph for a timeline.
///
/// The fade out of segment `i` starts at its cumulative timeline offset, so
/// every fade eats into the outgoing segment instead of extending the video.
pub fn build_crossfade_graph(timeline: &Timeline) -> MediaResult<String> {
    let durations = timeline.effective_durations();
    if durations.len() < 2 {
        return Err(MediaError::invalid_input(
            "crossfade assembly needs at least two segments",
        ));
    }

    let transition = timeline.transition_duration;
    if let Some(short) = durations.iter().position(|d| *d <= transition) {
        return Err(MediaError::invalid_input(format!(
            "segment {} ({:.3}s) is not longer than the {:.3}s transition",
            short, durations[short], transition
        )));
    }

    let mut graph = String::new();
    for (i, duration) in durations.iter().enumerate() {
        if i > 0 {
            graph.push(';');
        }
        graph.push_str(&conform_chain(
            i,
            timeline.width,
            timeline.height,
            timeline.frame_rate,
            *duration,
        ));
    }

    let offsets = timeline.crossfade_offsets();
    let mut previous = "v0".to_string();
    for (idx, offset) in offsets.iter().enumerate() {
        let next = offset.from_order + 1;
        let out = if idx + 1 == offsets.len() {
            VIDEO_OUT_LABEL.to_string()
        } else {
            format!("x{}", next)
        };
        let _ = write!(
            graph,
            ";[{prev}][v{next}]xfade=transition=fade:duration={t:.3}:offset={off:.3}[{out}]",
            prev = previous,
            next = next,
            t = transition,
            off = offset.timeline_offset,
            out = out,
        );
        previous = out;
    }

    Ok(graph)
}

/// Build the re-encoding `concat` filter graph for a timeline without fades.
pub fn build_concat_graph(timeline: &Timeline) -> MediaResult<String> {
    let durations = timeline.effective_durations();
    if durations.is_empty() {
        return Err(MediaError::invalid_input("timeline has no segments"));
    }

    let mut graph = String::new();
    for (i, duration) in durations.iter().enumerate() {
        graph.push_str(&conform_chain(
            i,
            timeline.width,
            timeline.height,
            timeline.frame_rate,
            *duration,
        ));
        graph.push(';');
    }
    for i in 0..durations.len() {
        let _ = write!(graph, "[v{}]", i);
    }
    let _ = write!(
        graph,
        "concat=n={}:v=1:a=0[{}]",
        durations.len(),
        VIDEO_OUT_LABEL
    );

    Ok(graph)
}

/// Whether stream copy can join these clips into the timeline's output.
pub fn can_stream_copy(streams: &[VideoStreamInfo], timeline: &Timeline) -> bool {
    let Some(first) = streams.first() else {
        return false;
    };
    streams.iter().all(|s| {
        s.width == timeline.width
            && s.height == timeline.height
            && s.codec == first.codec
            && (s.fps - timeline.frame_rate as f64).abs() < 0.01
    })
}

/// Joins normalized segments through the shared encoder pool.
#[derive(Debug, Clone)]
pub struct TimelineAssembler {
    pool: EncoderPool,
    encoding: EncodingConfig,
}

impl TimelineAssembler {
    pub fn new(pool: EncoderPool, encoding: EncodingConfig) -> Self {
        Self { pool, encoding }
    }

    /// Assemble `timeline` into `output`.
    ///
    /// Every segment must be normalized. Failure is an encoder error with the
    /// FFmpeg diagnostics attached.
    pub async fn assemble(&self, timeline: &Timeline, output: &Path) -> MediaResult<AssembledVideo> {
        let clips = normalized_clips(timeline)?;
        let expected_duration = timeline.expected_output_duration();

        info!(
            segments = clips.len(),
            transitions = timeline.uses_transitions(),
            expected_duration = expected_duration,
            "Assembling timeline"
        );

        if timeline.uses_transitions() {
            self.assemble_crossfade(timeline, &clips, output).await?;
        } else {
            self.assemble_concat(timeline, &clips, output).await?;
        }

        let measured_duration = match get_duration(output).await {
            Ok(d) => Some(d),
            Err(e) => {
                warn!("Could not probe assembled video: {}", e);
                None
            }
        };

        let assembled = AssembledVideo {
            path: output.to_path_buf(),
            expected_duration,
            measured_duration,
        };

        if assembled.exceeds_tolerance() {
            warn!(
                expected = expected_duration,
                measured = ?measured_duration,
                "Assembled duration drifted from plan"
            );
        }

        Ok(assembled)
    }

    async fn assemble_crossfade(
        &self,
        timeline: &Timeline,
        clips: &[PathBuf],
        output: &Path,
    ) -> MediaResult<()> {
        let graph = build_crossfade_graph(timeline)?;

        let mut cmd = FfmpegCommand::new(&clips[0], output);
        for clip in &clips[1..] {
            cmd = cmd.input(clip);
        }
        let cmd = cmd
            .filter_complex(graph)
            .map(format!("[{}]", VIDEO_OUT_LABEL))
            .no_audio()
            .frame_rate(timeline.frame_rate)
            .video_encoding(&self.encoding)
            .faststart();

        self.pool.run("assemble", &cmd).await
    }

    async fn assemble_concat(
        &self,
        timeline: &Timeline,
        clips: &[PathBuf],
        output: &Path,
    ) -> MediaResult<()> {
        let mut streams = Vec::with_capacity(clips.len());
        for clip in clips {
            match probe_media(clip).await {
                Ok(info) => match info.video {
                    Some(video) => streams.push(video),
                    None => break,
                },
                Err(e) => {
                    debug!(clip = %clip.display(), "Clip inspection failed, re-encoding: {}", e);
                    break;
                }
            }
        }

        if streams.len() == clips.len() && can_stream_copy(&streams, timeline) {
            self.concat_copy(clips, output).await
        } else {
            info!("Inputs differ from the output format, re-encoding concat");
            self.concat_encode(timeline, clips, output).await
        }
    }

    async fn concat_copy(&self, clips: &[PathBuf], output: &Path) -> MediaResult<()> {
        let list_path = output.with_extension("concat.txt");
        tokio::fs::write(&list_path, concat_list(clips)).await?;

        let cmd = FfmpegCommand::new(&list_path, output)
            .concat_list()
            .codec_copy()
            .no_audio()
            .faststart();

        let result = self.pool.run("assemble", &cmd).await;
        let _ = remove_if_exists(&list_path).await;
        result
    }

    async fn concat_encode(
        &self,
        timeline: &Timeline,
        clips: &[PathBuf],
        output: &Path,
    ) -> MediaResult<()> {
        let graph = build_concat_graph(timeline)?;

        let mut cmd = FfmpegCommand::new(&clips[0], output);
        for clip in &clips[1..] {
            cmd = cmd.input(clip);
        }
        let cmd = cmd
            .filter_complex(graph)
            .map(format!("[{}]", VIDEO_OUT_LABEL))
            .no_audio()
            .frame_rate(timeline.frame_rate)
            .video_encoding(&self.encoding)
            .faststart();

        self.pool.run("assemble", &cmd).await
    }
}

/// Normalized clip paths in playback order.
fn normalized_clips(timeline: &Timeline) -> MediaResult<Vec<PathBuf>> {
    if timeline.segments.is_empty() {
        return Err(MediaError::invalid_input("timeline has no segments"));
    }

    let mut segments: Vec<_> = timeline.segments.iter().collect();
    segments.sort_by_key(|s| s.order());

    segments
        .into_iter()
        .map(|segment| {
            segment
                .normalized_clip_path()
                .map(Path::to_path_buf)
                .ok_or_else(|| {
                    MediaError::invalid_input(format!(
                        "segment {} has not been normalized",
                        segment.order()
                    ))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_models::{AspectRatio, DurationPlanner, NormalizationMethod, ProviderKind};

    fn timeline(count: usize, total: f64, transitions: bool) -> Timeline {
        let plan = DurationPlanner::default().plan(count, total).unwrap();
        let images: Vec<PathBuf> = (0..count)
            .map(|i| PathBuf::from(format!("img{}.png", i)))
            .collect();
        let mut timeline =
            Timeline::from_plan(&plan, &images, AspectRatio::Portrait, 30, transitions).unwrap();
        for segment in &mut timeline.segments {
            let order = segment.order();
            segment.attach_raw_clip(format!("raw{}.mp4", order), 4.0, ProviderKind::Luma);
            segment.attach_normalized(
                format!("norm{}.mp4", order),
                NormalizationMethod::Rescale { factor: 1.5 },
            );
        }
        timeline
    }

    #[test]
    fn test_crossfade_graph_offsets() {
        // 3 x 6s with 0.5s fades
        let graph = build_crossfade_graph(&timeline(3, 19.0, true)).unwrap();

        assert!(graph.contains("[0:v]scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(graph.contains("pad=1080:1920:(ow-iw)/2:(oh-ih)/2"));
        assert!(graph.contains("[v0][v1]xfade=transition=fade:duration=0.500:offset=5.500[x1]"));
        assert!(graph.contains("[x1][v2]xfade=transition=fade:duration=0.500:offset=11.000[vout]"));
        assert_eq!(graph.matches("xfade").count(), 2);
    }

    #[test]
    fn test_two_segments_end_at_vout() {
        let graph = build_crossfade_graph(&timeline(2, 10.0, true)).unwrap();
        assert!(graph.ends_with("offset=4.250[vout]"));
    }

    #[test]
    fn test_degraded_segment_shifts_offsets() {
        let mut timeline = timeline(3, 19.0, true);
        timeline.segments[0].mark_degraded(NormalizationMethod::Rescale { factor: 1.5 }, "boom");

        let graph = build_crossfade_graph(&timeline).unwrap();
        // First segment keeps its 4s raw length
        assert!(graph.contains("offset=3.500[x1]"));
        assert!(graph.contains("offset=9.000[vout]"));
        assert!(graph.contains("[0:v]scale=1080:1920"));
        assert!(graph.contains("trim=duration=4.000"));
    }

    #[test]
    fn test_crossfade_needs_two_segments() {
        let single = timeline(1, 10.0, true);
        assert!(build_crossfade_graph(&single).is_err());
    }

    #[test]
    fn test_segment_shorter_than_transition_rejected() {
        let mut timeline = timeline(2, 10.0, true);
        timeline.transition_duration = 5.0;
        assert!(matches!(
            build_crossfade_graph(&timeline),
            Err(MediaError::InvalidInput(_))
        ));
    }

    fn stream(width: u32, height: u32, fps: f64, codec: &str) -> VideoStreamInfo {
        VideoStreamInfo {
            width,
            height,
            fps,
            codec: codec.to_string(),
        }
    }

    #[test]
    fn test_concat_graph_conforms_every_input() {
        let graph = build_concat_graph(&timeline(2, 10.0, false)).unwrap();

        assert!(graph.contains("[0:v]scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(graph.contains("[1:v]scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(graph.ends_with("[v0][v1]concat=n=2:v=1:a=0[vout]"));
        assert!(!graph.contains("xfade"));
    }

    #[test]
    fn test_single_segment_concat_graph() {
        let graph = build_concat_graph(&timeline(1, 10.0, true)).unwrap();
        assert!(graph.contains("trim=duration=10.000"));
        assert!(graph.ends_with("[v0]concat=n=1:v=1:a=0[vout]"));
    }

    #[test]
    fn test_stream_copy_needs_matching_inputs() {
        let timeline = timeline(2, 10.0, false);
        let matching = [stream(1080, 1920, 30.0, "h264"), stream(1080, 1920, 30.0, "h264")];
        assert!(can_stream_copy(&matching, &timeline));

        // Providers at their native size
        let mixed = [stream(720, 1280, 24.0, "h264"), stream(480, 854, 30.0, "h264")];
        assert!(!can_stream_copy(&mixed, &timeline));

        let codecs = [stream(1080, 1920, 30.0, "h264"), stream(1080, 1920, 30.0, "hevc")];
        assert!(!can_stream_copy(&codecs, &timeline));

        let rates = [stream(1080, 1920, 24.0, "h264"), stream(1080, 1920, 24.0, "h264")];
        assert!(!can_stream_copy(&rates, &timeline));

        assert!(!can_stream_copy(&[], &timeline));
    }

    #[test]
    fn test_normalized_clips_in_order() {
        let mut timeline = timeline(3, 19.0, false);
        timeline.segments.reverse();
        let clips = normalized_clips(&timeline).unwrap();
        assert_eq!(
            clips,
            vec![
                PathBuf::from("norm0.mp4"),
                PathBuf::from("norm1.mp4"),
                PathBuf::from("norm2.mp4")
            ]
        );
    }

    #[test]
    fn test_unnormalized_segment_rejected() {
        let plan = DurationPlanner::default().plan(2, 10.0).unwrap();
        let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let timeline = Timeline::from_plan(&plan, &images, AspectRatio::Portrait, 30, true).unwrap();
        assert!(normalized_clips(&timeline).is_err());
    }

    #[test]
    fn test_drift() {
        let video = AssembledVideo {
            path: PathBuf::from("out.mp4"),
            expected_duration: 18.0,
            measured_duration: Some(18.04),
        };
        assert!(!video.exceeds_tolerance());

        let video = AssembledVideo {
            measured_duration: Some(18.5),
            ..video
        };
        assert!(video.exceeds_tolerance());
        assert!((video.drift().unwrap() - 0.5).abs() < 1e-9);
    }
}
