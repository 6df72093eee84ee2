//! Shared data models for the AdReel video assembly pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Segments and the assembled timeline
//! - Duration planning and crossfade offset arithmetic
//! - Output aspect ratios and encoding configuration
//! - Run and provider identifiers

pub mod aspect;
pub mod encoding;
pub mod error;
pub mod provider;
pub mod run;
pub mod segment;
pub mod timeline;

// Re-export common types
pub use aspect::{AspectRatio, AspectRatioParseError};
pub use encoding::EncodingConfig;
pub use error::{PlanError, PlanResult};
pub use provider::{ProviderKind, ProviderKindParseError};
pub use run::RunId;
pub use segment::{NormalizationDegraded, NormalizationMethod, Segment, TransitionKind};
pub use timeline::{
    assembled_duration, crossfade_offsets, CrossfadeOffset, DurationPlan, DurationPlanner,
    Timeline, DEFAULT_FRAME_RATE, DEFAULT_TOTAL_DURATION, DEFAULT_TRANSITION_DURATION,
    MAX_IMAGES, MIN_IMAGES,
};
