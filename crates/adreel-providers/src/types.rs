//! Request and result types shared by every provider.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use adreel_models::{AspectRatio, ProviderKind};

use crate::error::{ProviderError, ProviderResult};

/// One image-to-video generation request.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    /// Segment this clip is for
    pub order: usize,
    pub image: Vec<u8>,
    pub mime_type: String,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    /// Where the downloaded clip is written
    pub output_path: PathBuf,
}

impl ClipRequest {
    pub fn new(
        order: usize,
        image: Vec<u8>,
        mime_type: impl Into<String>,
        prompt: impl Into<String>,
        aspect_ratio: AspectRatio,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            order,
            image,
            mime_type: mime_type.into(),
            prompt: prompt.into(),
            aspect_ratio,
            output_path: output_path.into(),
        }
    }

    /// Read the source image from disk.
    pub async fn from_image_file(
        order: usize,
        image_path: &Path,
        prompt: impl Into<String>,
        aspect_ratio: AspectRatio,
        output_path: impl Into<PathBuf>,
    ) -> ProviderResult<Self> {
        let mime_type = mime_type_for(image_path).ok_or_else(|| {
            ProviderError::Validation(format!(
                "unsupported image type: {}",
                image_path.display()
            ))
        })?;
        let image = tokio::fs::read(image_path).await?;
        if image.is_empty() {
            return Err(ProviderError::Validation(format!(
                "image is empty: {}",
                image_path.display()
            )));
        }
        Ok(Self::new(order, image, mime_type, prompt, aspect_ratio, output_path))
    }

    /// Image inlined as a `data:` URI.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.image))
    }
}

/// MIME type from the file extension.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// A clip produced by a provider and written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedClip {
    pub provider: ProviderKind,
    pub path: PathBuf,
    /// The provider's fixed output length, not a measurement
    pub duration: f64,
}
