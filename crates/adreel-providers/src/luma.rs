//! Generation-state provider: create a generation, poll until it completes.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use adreel_models::ProviderKind;

use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, download_clip, ensure_success, join_url, poll_until, PollState};
use crate::provider::ClipProvider;
use crate::types::{ClipRequest, GeneratedClip};

const GENERATIONS_PATH: &str = "/dream-machine/v1/generations";

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    aspect_ratio: &'static str,
    duration: String,
    keyframes: Keyframes,
}

#[derive(Debug, Serialize)]
struct Keyframes {
    frame0: Keyframe,
}

#[derive(Debug, Serialize)]
struct Keyframe {
    #[serde(rename = "type")]
    kind: &'static str,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Generation {
    id: String,
    state: String,
    failure_reason: Option<String>,
    assets: Option<GenerationAssets>,
}

#[derive(Debug, Deserialize)]
struct GenerationAssets {
    video: Option<String>,
}

pub struct LumaProvider {
    http: Client,
    settings: ProviderSettings,
    api_key: String,
}

impl LumaProvider {
    pub fn new(settings: ProviderSettings) -> ProviderResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("LUMA_API_KEY is not set".to_string()))?;
        let http = build_client(settings.http_timeout)?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    async fn create(&self, request: &ClipRequest) -> ProviderResult<String> {
        let body = GenerationRequest {
            prompt: &request.prompt,
            model: &self.settings.model,
            aspect_ratio: request.aspect_ratio.as_str(),
            duration: format!("{}s", self.settings.raw_clip_duration.round() as u32),
            keyframes: Keyframes {
                frame0: Keyframe {
                    kind: "image",
                    url: request.data_uri(),
                },
            },
        };

        let url = join_url(&self.settings.base_url, GENERATIONS_PATH);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let generation: Generation = ensure_success(response).await?.json().await?;
        Ok(generation.id)
    }

    async fn poll(&self, generation_id: &str) -> ProviderResult<PollState<String>> {
        let url = join_url(
            &self.settings.base_url,
            &format!("{}/{}", GENERATIONS_PATH, generation_id),
        );
        let response = self.http.get(&url).bearer_auth(&self.api_key).send().await?;
        let generation: Generation = ensure_success(response).await?.json().await?;

        match generation.state.as_str() {
            "completed" => generation
                .assets
                .and_then(|a| a.video)
                .map(PollState::Ready)
                .ok_or_else(|| {
                    ProviderError::InvalidResponse("generation completed without video".to_string())
                }),
            "failed" => Err(ProviderError::Transient(
                generation
                    .failure_reason
                    .unwrap_or_else(|| "generation failed".to_string()),
            )),
            other => Ok(PollState::Pending(other.to_string())),
        }
    }
}

#[async_trait]
impl ClipProvider for LumaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Luma
    }

    fn raw_clip_duration(&self) -> f64 {
        self.settings.raw_clip_duration
    }

    async fn generate(&self, request: &ClipRequest) -> ProviderResult<GeneratedClip> {
        let generation_id = self.create(request).await?;
        info!(segment = request.order, generation_id = %generation_id, "Luma generation created");

        let url = poll_until(self.settings.poll_interval, || self.poll(&generation_id)).await?;
        download_clip(&self.http, &url, &request.output_path).await?;

        Ok(GeneratedClip {
            provider: ProviderKind::Luma,
            path: request.output_path.clone(),
            duration: self.settings.raw_clip_duration,
        })
    }
}
