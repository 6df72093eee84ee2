//! The clip provider abstraction.

use async_trait::async_trait;

use adreel_models::ProviderKind;

use crate::error::ProviderResult;
use crate::types::{ClipRequest, GeneratedClip};

/// Converts one still image plus a motion prompt into a short video clip.
///
/// Implementations make a single attempt. They never retry and never fall
/// back to another service; the [`FallbackChain`](crate::FallbackChain)
/// decides what happens after a failure.
#[async_trait]
pub trait ClipProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Length of every clip this provider produces.
    fn raw_clip_duration(&self) -> f64;

    /// Generate a clip and write it to `request.output_path`.
    async fn generate(&self, request: &ClipRequest) -> ProviderResult<GeneratedClip>;
}
