//! Segment model: one image's slot in the output timeline.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ProviderKind;

/// Transition at a segment edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    #[default]
    None,
    Crossfade,
}

/// How a raw clip was brought to its target duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum NormalizationMethod {
    /// Raw clip already matches the target; copied unchanged.
    Copy,
    /// Raw clip played `count` times via lossless concat, then cut to the target.
    Loop { count: u32 },
    /// Timestamps scaled by `factor` (>1 slows down, <1 speeds up), re-encoded.
    Rescale { factor: f64 },
}

impl NormalizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizationMethod::Copy => "copy",
            NormalizationMethod::Loop { .. } => "loop",
            NormalizationMethod::Rescale { .. } => "rescale",
        }
    }

    /// Whether this method needs a re-encode.
    pub fn requires_encode(&self) -> bool {
        matches!(self, NormalizationMethod::Rescale { .. })
    }
}

/// Normalization failed and the raw clip stands in for the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizationDegraded {
    /// What the normalizer tried to do.
    pub attempted: NormalizationMethod,
    /// Encoder diagnostic.
    pub reason: String,
}

/// One planned slot in the output timeline.
///
/// `order`, `source_image_path` and `target_duration` are fixed at planning
/// time. Raw and normalized clip fields are filled in as the pipeline
/// advances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Segment {
    order: usize,
    source_image_path: PathBuf,
    target_duration: f64,
    raw_clip_path: Option<PathBuf>,
    raw_clip_duration: Option<f64>,
    provider: Option<ProviderKind>,
    normalized_clip_path: Option<PathBuf>,
    normalization: Option<NormalizationMethod>,
    degraded: Option<NormalizationDegraded>,
    transition_in: TransitionKind,
    transition_out: TransitionKind,
}

impl Segment {
    /// Create a planned segment.
    ///
    /// Outer edges of the first and last segment never carry a transition.
    pub fn new(
        order: usize,
        segment_count: usize,
        source_image_path: impl Into<PathBuf>,
        target_duration: f64,
        transitions_enabled: bool,
    ) -> Self {
        let crossfade = transitions_enabled && segment_count > 1;
        let transition_in = if crossfade && order > 0 {
            TransitionKind::Crossfade
        } else {
            TransitionKind::None
        };
        let transition_out = if crossfade && order + 1 < segment_count {
            TransitionKind::Crossfade
        } else {
            TransitionKind::None
        };

        Self {
            order,
            source_image_path: source_image_path.into(),
            target_duration,
            raw_clip_path: None,
            raw_clip_duration: None,
            provider: None,
            normalized_clip_path: None,
            normalization: None,
            degraded: None,
            transition_in,
            transition_out,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn source_image_path(&self) -> &Path {
        &self.source_image_path
    }

    pub fn target_duration(&self) -> f64 {
        self.target_duration
    }

    pub fn raw_clip_path(&self) -> Option<&Path> {
        self.raw_clip_path.as_deref()
    }

    pub fn raw_clip_duration(&self) -> Option<f64> {
        self.raw_clip_duration
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        self.provider
    }

    pub fn normalized_clip_path(&self) -> Option<&Path> {
        self.normalized_clip_path.as_deref()
    }

    pub fn normalization(&self) -> Option<NormalizationMethod> {
        self.normalization
    }

    pub fn degraded(&self) -> Option<&NormalizationDegraded> {
        self.degraded.as_ref()
    }

    pub fn transition_in(&self) -> TransitionKind {
        self.transition_in
    }

    pub fn transition_out(&self) -> TransitionKind {
        self.transition_out
    }

    /// Record the provider output for this segment.
    pub fn attach_raw_clip(
        &mut self,
        path: impl Into<PathBuf>,
        duration: f64,
        provider: ProviderKind,
    ) {
        self.raw_clip_path = Some(path.into());
        self.raw_clip_duration = Some(duration);
        self.provider = Some(provider);
    }

    /// Record a successful normalization.
    pub fn attach_normalized(&mut self, path: impl Into<PathBuf>, method: NormalizationMethod) {
        self.normalized_clip_path = Some(path.into());
        self.normalization = Some(method);
        self.degraded = None;
    }

    /// Record a failed normalization; the raw clip is used as-is.
    pub fn mark_degraded(&mut self, attempted: NormalizationMethod, reason: impl Into<String>) {
        self.normalized_clip_path = self.raw_clip_path.clone();
        self.normalization = None;
        self.degraded = Some(NormalizationDegraded {
            attempted,
            reason: reason.into(),
        });
    }

    /// Duration this segment actually occupies once normalized.
    ///
    /// A copied or degraded segment is the untouched raw clip, so it keeps the
    /// raw length. Loop and rescale outputs are cut to `target_duration`.
    pub fn effective_duration(&self) -> f64 {
        let untouched = self.degraded.is_some()
            || self.normalization == Some(NormalizationMethod::Copy);
        match self.raw_clip_duration {
            Some(raw) if untouched => raw,
            _ => self.target_duration,
        }
    }

    /// Ready for timeline assembly.
    pub fn is_normalized(&self) -> bool {
        self.normalized_clip_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_edges() {
        let first = Segment::new(0, 3, "a.png", 6.0, true);
        let middle = Segment::new(1, 3, "b.png", 6.0, true);
        let last = Segment::new(2, 3, "c.png", 6.0, true);

        assert_eq!(first.transition_in(), TransitionKind::None);
        assert_eq!(first.transition_out(), TransitionKind::Crossfade);
        assert_eq!(middle.transition_in(), TransitionKind::Crossfade);
        assert_eq!(middle.transition_out(), TransitionKind::Crossfade);
        assert_eq!(last.transition_in(), TransitionKind::Crossfade);
        assert_eq!(last.transition_out(), TransitionKind::None);
    }

    #[test]
    fn test_single_segment_has_no_transitions() {
        let only = Segment::new(0, 1, "a.png", 20.0, true);
        assert_eq!(only.transition_in(), TransitionKind::None);
        assert_eq!(only.transition_out(), TransitionKind::None);

        let disabled = Segment::new(1, 3, "b.png", 6.0, false);
        assert_eq!(disabled.transition_in(), TransitionKind::None);
    }

    #[test]
    fn test_lifecycle() {
        let mut segment = Segment::new(0, 2, "a.png", 8.0, true);
        assert!(!segment.is_normalized());

        segment.attach_raw_clip("raw.mp4", 4.0, ProviderKind::Runway);
        assert_eq!(segment.raw_clip_duration(), Some(4.0));
        assert_eq!(segment.provider(), Some(ProviderKind::Runway));

        segment.attach_normalized("norm.mp4", NormalizationMethod::Loop { count: 2 });
        assert!(segment.is_normalized());
        assert_eq!(segment.effective_duration(), 8.0);
    }

    #[test]
    fn test_copied_clip_keeps_raw_length() {
        let mut segment = Segment::new(0, 2, "a.png", 4.08, true);
        segment.attach_raw_clip("raw.mp4", 4.0, ProviderKind::Runway);
        segment.attach_normalized("norm.mp4", NormalizationMethod::Copy);
        assert_eq!(segment.effective_duration(), 4.0);

        segment.attach_normalized("norm.mp4", NormalizationMethod::Rescale { factor: 1.02 });
        assert_eq!(segment.effective_duration(), 4.08);
    }

    #[test]
    fn test_degraded_uses_raw_clip() {
        let mut segment = Segment::new(0, 2, "a.png", 5.0, true);
        segment.attach_raw_clip("raw.mp4", 4.0, ProviderKind::Luma);
        segment.mark_degraded(NormalizationMethod::Rescale { factor: 1.25 }, "encoder crashed");

        assert_eq!(segment.normalized_clip_path(), Some(Path::new("raw.mp4")));
        assert_eq!(segment.effective_duration(), 4.0);
        assert_eq!(segment.target_duration(), 5.0);
        assert!(segment.degraded().is_some());
    }
}
