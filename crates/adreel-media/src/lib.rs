#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for ad reel rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2` and stderr capture on failure
//! - A bounded encoder pool shared by every encoding stage
//! - Segment normalization (copy, loop, rescale)
//! - Timeline assembly with `xfade` crossfades
//! - Voiceover muxing with optional watermark overlay

pub mod assemble;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod metrics;
pub mod mux;
pub mod normalize;
pub mod pool;
pub mod probe;
pub mod progress;
pub mod thumbnail;
pub mod watermark;

pub use assemble::{
    build_concat_graph, build_crossfade_graph, can_stream_copy, AssembledVideo, TimelineAssembler,
};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{move_file, move_into};
pub use mux::AudioMuxer;
pub use normalize::{choose_method, SegmentNormalizer};
pub use pool::{available_cores, EncoderPool};
pub use probe::{get_duration, probe_media, MediaInfo, VideoStreamInfo};
pub use progress::FfmpegProgress;
pub use thumbnail::generate_poster;
pub use watermark::WatermarkConfig;
