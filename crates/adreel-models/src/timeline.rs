//! Timeline planning and crossfade arithmetic.
//!
//! # Duration budget
//!
//! The planner spends `(n - 1) * transition` seconds of the requested total on
//! transitions and splits the rest uniformly:
//!
//! ```text
//! per_segment = (total - (n - 1) * t) / n
//! ```
//!
//! # Crossfade offsets
//!
//! Each fade starts `t` seconds before its outgoing segment's nominal end, so
//! it eats into that segment rather than extending the timeline. Assembled
//! length is therefore `sum(d) - (n - 1) * t`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PlanError, PlanResult};
use crate::{AspectRatio, Segment};

/// Minimum number of images per run.
pub const MIN_IMAGES: usize = 1;
/// Maximum number of images per run.
pub const MAX_IMAGES: usize = 5;
/// Default requested video length in seconds.
pub const DEFAULT_TOTAL_DURATION: f64 = 20.0;
/// Default crossfade length in seconds.
pub const DEFAULT_TRANSITION_DURATION: f64 = 0.5;
/// Default output frame rate.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Output of the duration planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DurationPlan {
    /// Target duration per segment, in playback order.
    pub segment_durations: Vec<f64>,
    /// Requested total duration.
    pub total_duration: f64,
    /// Length of each crossfade.
    pub transition_duration: f64,
    /// Time reserved for all transitions.
    pub total_transition_time: f64,
}

impl DurationPlan {
    pub fn segment_count(&self) -> usize {
        self.segment_durations.len()
    }

    /// Sum of segment targets plus transition budget.
    pub fn budgeted_total(&self) -> f64 {
        self.segment_durations.iter().sum::<f64>() + self.total_transition_time
    }
}

/// Pure planner: image count + total duration -> per-segment targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationPlanner {
    transition_duration: f64,
}

impl Default for DurationPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSITION_DURATION)
    }
}

impl DurationPlanner {
    pub fn new(transition_duration: f64) -> Self {
        Self {
            transition_duration,
        }
    }

    pub fn transition_duration(&self) -> f64 {
        self.transition_duration
    }

    /// Plan uniform segment durations.
    ///
    /// Durations are not weighted by position even though prompts are.
    pub fn plan(&self, image_count: usize, total_duration: f64) -> PlanResult<DurationPlan> {
        if image_count == 0 {
            return Err(PlanError::invalid_input("image count must be at least 1"));
        }
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(PlanError::invalid_input(format!(
                "total duration must be positive, got {}",
                total_duration
            )));
        }
        if !self.transition_duration.is_finite() || self.transition_duration < 0.0 {
            return Err(PlanError::invalid_input(format!(
                "transition duration must be non-negative, got {}",
                self.transition_duration
            )));
        }

        let total_transition_time = (image_count - 1) as f64 * self.transition_duration;
        let available_content = total_duration - total_transition_time;
        if available_content <= 0.0 {
            return Err(PlanError::invalid_input(format!(
                "transitions ({:.2}s) consume the whole duration ({:.2}s)",
                total_transition_time, total_duration
            )));
        }

        let per_segment = available_content / image_count as f64;
        // Each crossfade must fit inside both segments it joins.
        if image_count > 1 && self.transition_duration > 0.0 && per_segment <= self.transition_duration {
            return Err(PlanError::invalid_input(format!(
                "segments of {:.3}s are not longer than the {:.3}s transition",
                per_segment, self.transition_duration
            )));
        }

        Ok(DurationPlan {
            segment_durations: vec![per_segment; image_count],
            total_duration,
            transition_duration: self.transition_duration,
            total_transition_time,
        })
    }
}

/// Where a crossfade out of one segment begins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CrossfadeOffset {
    /// Order of the outgoing segment.
    pub from_order: usize,
    /// Offset measured from the outgoing segment's own start (`d_i - t`).
    pub local_offset: f64,
    /// Offset measured from the start of the assembled stream.
    pub timeline_offset: f64,
}

/// Compute one offset per adjacent pair.
///
/// Segment `i` starts at `sum(d_0..d_{i-1}) - i * t` in the assembled stream,
/// so the fade out of it begins at that start plus `d_i - t`.
pub fn crossfade_offsets(durations: &[f64], transition: f64) -> Vec<CrossfadeOffset> {
    let mut offsets = Vec::with_capacity(durations.len().saturating_sub(1));
    let mut segment_start = 0.0;

    for (i, duration) in durations.iter().enumerate() {
        if i + 1 == durations.len() {
            break;
        }
        let local_offset = (duration - transition).max(0.0);
        offsets.push(CrossfadeOffset {
            from_order: i,
            local_offset,
            timeline_offset: segment_start + local_offset,
        });
        segment_start += local_offset;
    }

    offsets
}

/// Output length after crossfading `durations` with `transition` overlaps.
pub fn assembled_duration(durations: &[f64], transition: f64) -> f64 {
    let sum: f64 = durations.iter().sum();
    sum - durations.len().saturating_sub(1) as f64 * transition
}

/// Ordered segments plus global output parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    pub segments: Vec<Segment>,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
    pub total_duration: f64,
    pub transition_duration: f64,
    pub transitions_enabled: bool,
}

impl Timeline {
    /// Build planned segments from a duration plan and the source images.
    pub fn from_plan(
        plan: &DurationPlan,
        images: &[PathBuf],
        aspect: AspectRatio,
        frame_rate: u32,
        transitions_enabled: bool,
    ) -> PlanResult<Self> {
        if images.len() != plan.segment_count() {
            return Err(PlanError::invalid_input(format!(
                "plan has {} segments but {} images were supplied",
                plan.segment_count(),
                images.len()
            )));
        }

        let count = images.len();
        let segments = images
            .iter()
            .zip(&plan.segment_durations)
            .enumerate()
            .map(|(order, (image, duration))| {
                Segment::new(order, count, image.clone(), *duration, transitions_enabled)
            })
            .collect();

        let (width, height) = aspect.dimensions();

        Ok(Self {
            segments,
            frame_rate,
            width,
            height,
            total_duration: plan.total_duration,
            transition_duration: plan.transition_duration,
            transitions_enabled,
        })
    }

    /// Whether assembly crossfades (two or more segments and enabled).
    pub fn uses_transitions(&self) -> bool {
        self.transitions_enabled && self.segments.len() > 1 && self.transition_duration > 0.0
    }

    /// Durations each segment occupies once normalized, in order.
    pub fn effective_durations(&self) -> Vec<f64> {
        self.segments.iter().map(Segment::effective_duration).collect()
    }

    pub fn crossfade_offsets(&self) -> Vec<CrossfadeOffset> {
        if !self.uses_transitions() {
            return Vec::new();
        }
        crossfade_offsets(&self.effective_durations(), self.transition_duration)
    }

    /// Expected length of the assembled silent video.
    pub fn expected_output_duration(&self) -> f64 {
        let durations = self.effective_durations();
        if self.uses_transitions() {
            assembled_duration(&durations, self.transition_duration)
        } else {
            durations.iter().sum()
        }
    }

    /// Segments sorted by `order`, independent of completion order.
    pub fn sort_segments(&mut self) {
        self.segments.sort_by_key(Segment::order);
    }
}
