//! Terminal outcome of a render run.
//!
//! A run either completes with a final video or aborts carrying whatever
//! it produced before the failing stage, plus a provider-by-provider
//! breakdown for segments whose clips could not be generated.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adreel_models::{NormalizationDegraded, NormalizationMethod, ProviderKind, RunId, Segment};
use adreel_providers::ProviderFailure;

/// Orchestrator stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Idle,
    PlanningDurations,
    GeneratingClips,
    NormalizingSegments,
    AssemblingTimeline,
    GeneratingVoiceover,
    Muxing,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::PlanningDurations => "planning_durations",
            PipelineState::GeneratingClips => "generating_clips",
            PipelineState::NormalizingSegments => "normalizing_segments",
            PipelineState::AssemblingTimeline => "assembling_timeline",
            PipelineState::GeneratingVoiceover => "generating_voiceover",
            PipelineState::Muxing => "muxing",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A clip file tied to its segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipArtifact {
    pub order: usize,
    pub path: PathBuf,
    pub provider: Option<ProviderKind>,
}

/// Everything produced before a run aborted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialArtifacts {
    pub script: Option<String>,
    pub raw_clips: Vec<ClipArtifact>,
    pub normalized_clips: Vec<ClipArtifact>,
    pub silent_video: Option<PathBuf>,
    pub audio: Option<PathBuf>,
}

impl PartialArtifacts {
    pub fn is_empty(&self) -> bool {
        self.script.is_none()
            && self.raw_clips.is_empty()
            && self.normalized_clips.is_empty()
            && self.silent_video.is_none()
            && self.audio.is_none()
    }
}

/// Every provider failure for one segment, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentFailure {
    pub order: usize,
    pub failures: Vec<ProviderFailure>,
}

/// How one segment ended up in the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub order: usize,
    pub provider: Option<ProviderKind>,
    pub target_duration: f64,
    pub effective_duration: f64,
    pub normalization: Option<NormalizationMethod>,
    /// Set when normalization failed and the raw clip was used
    pub degraded: Option<NormalizationDegraded>,
    /// Providers that failed before the one that produced the clip
    pub fallback_failures: Vec<ProviderFailure>,
}

impl SegmentReport {
    pub fn from_segment(segment: &Segment, fallback_failures: Vec<ProviderFailure>) -> Self {
        Self {
            order: segment.order(),
            provider: segment.provider(),
            target_duration: segment.target_duration(),
            effective_duration: segment.effective_duration(),
            normalization: segment.normalization(),
            degraded: segment.degraded().cloned(),
            fallback_failures,
        }
    }
}

/// Planned against probed length of the silent video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationReport {
    pub expected: f64,
    pub measured: Option<f64>,
    pub drift: Option<f64>,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub run_id: RunId,
    pub video_path: PathBuf,
    pub poster_path: Option<PathBuf>,
    pub script: String,
    pub duration: DurationReport,
    pub segments: Vec<SegmentReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CompletedRun {
    /// Segments that fell back to their raw clip.
    pub fn degraded_segments(&self) -> Vec<usize> {
        self.segments
            .iter()
            .filter(|s| s.degraded.is_some())
            .map(|s| s.order)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbortedRun {
    pub run_id: RunId,
    /// Stage that failed
    pub stage: PipelineState,
    pub error_kind: String,
    pub error: String,
    /// Encoder stderr tail when an encoder failed
    pub diagnostics: Option<String>,
    pub segment_failures: Vec<SegmentFailure>,
    pub partial: PartialArtifacts,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Completed(CompletedRun),
    Aborted(AbortedRun),
}

impl PipelineResult {
    pub fn run_id(&self) -> &RunId {
        match self {
            PipelineResult::Completed(run) => &run.run_id,
            PipelineResult::Aborted(run) => &run.run_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineResult::Completed(_))
    }

    pub fn video_path(&self) -> Option<&PathBuf> {
        match self {
            PipelineResult::Completed(run) => Some(&run.video_path),
            PipelineResult::Aborted(_) => None,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            PipelineResult::Completed(_) => "completed",
            PipelineResult::Aborted(_) => "aborted",
        }
    }
}
