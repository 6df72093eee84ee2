//! Encoder-backed tests. They need ffmpeg and ffprobe on PATH and are
//! ignored by default (`cargo test -- --ignored`).

use std::path::{Path, PathBuf};

use adreel_media::{
    get_duration, probe_media, AudioMuxer, EncoderPool, FfmpegCommand, FfmpegRunner,
    MediaError, SegmentNormalizer, TimelineAssembler,
};
use adreel_models::{
    AspectRatio, DurationPlanner, EncodingConfig, NormalizationMethod, ProviderKind, Segment,
    Timeline,
};
use tempfile::TempDir;

/// Render a synthetic clip of `seconds` at `width`x`height`.
async fn test_clip(dir: &Path, name: &str, seconds: f64, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let source = format!(
        "testsrc=duration={}:size={}x{}:rate=24",
        seconds, width, height
    );
    let cmd = FfmpegCommand::new(source, &path)
        .input_args(["-f", "lavfi"])
        .video_encoding(&EncodingConfig::default().with_crf(35));
    FfmpegRunner::new().run(&cmd).await.unwrap();
    path
}

async fn test_tone(dir: &Path, seconds: f64) -> PathBuf {
    let path = dir.join("voice.m4a");
    let cmd = FfmpegCommand::new(format!("sine=frequency=440:duration={}", seconds), &path)
        .input_args(["-f", "lavfi"])
        .audio_codec("aac");
    FfmpegRunner::new().run(&cmd).await.unwrap();
    path
}

fn normalizer() -> SegmentNormalizer {
    SegmentNormalizer::new(EncoderPool::new(2), EncodingConfig::default(), 30)
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn loop_doubles_four_second_clip() {
    let dir = TempDir::new().unwrap();
    let raw = test_clip(dir.path(), "raw.mp4", 4.0, 320, 568).await;

    let mut segment = Segment::new(0, 1, "a.png", 8.0, false);
    segment.attach_raw_clip(&raw, 4.0, ProviderKind::Replicate);
    normalizer().normalize(&mut segment, dir.path()).await.unwrap();

    assert_eq!(segment.normalization(), Some(NormalizationMethod::Loop { count: 2 }));
    let duration = get_duration(segment.normalized_clip_path().unwrap()).await.unwrap();
    assert!((duration - 8.0).abs() <= 0.1, "got {}", duration);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn loop_covers_target_above_whole_multiple() {
    let dir = TempDir::new().unwrap();
    let raw = test_clip(dir.path(), "raw.mp4", 4.0, 320, 568).await;

    // 3.075 raw lengths: four plays cut back to 12.3s
    let mut segment = Segment::new(0, 2, "a.png", 12.3, true);
    segment.attach_raw_clip(&raw, 4.0, ProviderKind::Luma);
    normalizer().normalize(&mut segment, dir.path()).await.unwrap();

    assert_eq!(segment.normalization(), Some(NormalizationMethod::Loop { count: 4 }));
    let duration = get_duration(segment.normalized_clip_path().unwrap()).await.unwrap();
    assert!((duration - 12.3).abs() <= 0.1, "got {}", duration);
    assert!((segment.effective_duration() - 12.3).abs() < 1e-9);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn rescale_stretches_to_target() {
    let dir = TempDir::new().unwrap();
    let raw = test_clip(dir.path(), "raw.mp4", 4.0, 320, 568).await;

    let mut segment = Segment::new(0, 1, "a.png", 5.0, false);
    segment.attach_raw_clip(&raw, 4.0, ProviderKind::Replicate);
    normalizer().normalize(&mut segment, dir.path()).await.unwrap();

    assert!(segment.degraded().is_none());
    assert!(matches!(
        segment.normalization(),
        Some(NormalizationMethod::Rescale { .. })
    ));
    let duration = get_duration(segment.normalized_clip_path().unwrap()).await.unwrap();
    assert!((duration - 5.0).abs() <= 0.1, "got {}", duration);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn crossfade_assembly_matches_formula() {
    let dir = TempDir::new().unwrap();

    // n = 3, d = 3.0, t = 0.5 -> 3 * 3.0 - 2 * 0.5 = 8.0
    let plan = DurationPlanner::new(0.5).plan(3, 10.0).unwrap();
    let images: Vec<PathBuf> = (0..3).map(|i| PathBuf::from(format!("{}.png", i))).collect();
    let mut timeline =
        Timeline::from_plan(&plan, &images, AspectRatio::Portrait, 30, true).unwrap();

    // Mixed geometry, as when providers differ
    let sizes = [(320, 568), (480, 480), (568, 320)];
    for (segment, (w, h)) in timeline.segments.iter_mut().zip(sizes) {
        let clip = test_clip(dir.path(), &format!("n{}.mp4", segment.order()), 3.0, w, h).await;
        segment.attach_raw_clip(&clip, 3.0, ProviderKind::Luma);
        segment.attach_normalized(&clip, NormalizationMethod::Copy);
    }

    let assembler = TimelineAssembler::new(EncoderPool::new(2), EncodingConfig::default());
    let output = dir.path().join("assembled.mp4");
    let assembled = assembler.assemble(&timeline, &output).await.unwrap();

    assert!((assembled.expected_duration - 8.0).abs() < 1e-9);
    let measured = assembled.measured_duration.unwrap();
    assert!((measured - 8.0).abs() <= 0.1, "got {}", measured);

    let info = probe_media(&output).await.unwrap();
    let video = info.video_stream().unwrap();
    assert_eq!((video.width, video.height), (1080, 1920));
    assert!(!info.has_audio);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn concat_assembly_without_transitions() {
    let dir = TempDir::new().unwrap();
    let plan = DurationPlanner::new(0.5).plan(2, 8.5).unwrap();
    let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
    let mut timeline =
        Timeline::from_plan(&plan, &images, AspectRatio::Portrait, 30, false).unwrap();

    for segment in &mut timeline.segments {
        let clip = test_clip(dir.path(), &format!("n{}.mp4", segment.order()), 4.0, 320, 568).await;
        segment.attach_raw_clip(&clip, 4.0, ProviderKind::Runway);
        segment.attach_normalized(&clip, NormalizationMethod::Copy);
    }

    let assembler = TimelineAssembler::new(EncoderPool::new(1), EncodingConfig::default());
    let assembled = assembler
        .assemble(&timeline, &dir.path().join("joined.mp4"))
        .await
        .unwrap();

    let measured = assembled.measured_duration.unwrap();
    assert!((measured - 8.0).abs() <= 0.1, "got {}", measured);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn concat_conforms_mixed_provider_sizes() {
    let dir = TempDir::new().unwrap();
    let plan = DurationPlanner::new(0.0).plan(2, 8.0).unwrap();
    let images = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
    let mut timeline =
        Timeline::from_plan(&plan, &images, AspectRatio::Portrait, 30, false).unwrap();

    // One provider at 720p portrait, the other at 480p
    let sizes = [(720, 1280), (480, 854)];
    for (segment, (w, h)) in timeline.segments.iter_mut().zip(sizes) {
        let clip = test_clip(dir.path(), &format!("n{}.mp4", segment.order()), 4.0, w, h).await;
        segment.attach_raw_clip(&clip, 4.0, ProviderKind::Runway);
        segment.attach_normalized(&clip, NormalizationMethod::Copy);
    }

    let assembler = TimelineAssembler::new(EncoderPool::new(1), EncodingConfig::default());
    let output = dir.path().join("joined.mp4");
    let assembled = assembler.assemble(&timeline, &output).await.unwrap();

    let measured = assembled.measured_duration.unwrap();
    assert!((measured - 8.0).abs() <= 0.1, "got {}", measured);

    let info = probe_media(&output).await.unwrap();
    let video = info.video_stream().unwrap();
    assert_eq!((video.width, video.height), (1080, 1920));
    assert!((video.fps - 30.0).abs() < 0.01);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn mux_stops_at_shorter_stream() {
    let dir = TempDir::new().unwrap();
    let video = test_clip(dir.path(), "silent.mp4", 4.0, 320, 568).await;
    let voice = test_tone(dir.path(), 10.0).await;
    let output = dir.path().join("final.mp4");

    AudioMuxer::new(EncoderPool::new(1), EncodingConfig::default())
        .mux(&video, &voice, &output)
        .await
        .unwrap();

    let info = probe_media(&output).await.unwrap();
    assert!(info.has_audio);
    assert!(info.duration < 4.5, "got {}", info.duration);
}

#[tokio::test]
#[ignore = "requires ffmpeg and ffprobe"]
async fn encoder_failure_carries_diagnostics() {
    let dir = TempDir::new().unwrap();
    let bogus = dir.path().join("bogus.mp4");
    tokio::fs::write(&bogus, b"definitely not a video").await.unwrap();

    let cmd = FfmpegCommand::new(&bogus, dir.path().join("out.mp4"));
    let err = FfmpegRunner::new().run(&cmd).await.unwrap_err();

    match err {
        MediaError::FfmpegFailed { stderr, .. } => {
            assert!(stderr.is_some_and(|s| !s.is_empty()));
        }
        other => panic!("expected FfmpegFailed, got {:?}", other),
    }
}
