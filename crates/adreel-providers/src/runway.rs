//! Task-queue provider: submit an image-to-video task, poll the task.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

use adreel_models::{AspectRatio, ProviderKind};

use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, download_clip, ensure_success, join_url, poll_until, PollState};
use crate::provider::ClipProvider;
use crate::types::{ClipRequest, GeneratedClip};

const API_VERSION: &str = "2024-11-06";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskRequest<'a> {
    model: &'a str,
    prompt_image: String,
    prompt_text: &'a str,
    ratio: &'static str,
    duration: u32,
}

#[derive(Debug, Deserialize)]
struct TaskCreated {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskStatus {
    status: String,
    #[serde(default)]
    output: Vec<String>,
    failure: Option<String>,
    failure_code: Option<String>,
}

fn ratio_for(aspect: AspectRatio) -> &'static str {
    match aspect {
        AspectRatio::Portrait => "720:1280",
        AspectRatio::Landscape => "1280:720",
        AspectRatio::Square => "960:960",
    }
}

/// Map a failed task to an error class.
///
/// Content-safety and input problems will fail the same way again.
fn task_failure(status: &TaskStatus) -> ProviderError {
    let message = status
        .failure
        .clone()
        .unwrap_or_else(|| "task failed".to_string());
    match status.failure_code.as_deref() {
        Some(code) if code.starts_with("SAFETY") || code.starts_with("INPUT") => {
            ProviderError::Validation(format!("{}: {}", code, message))
        }
        Some(code) => ProviderError::Transient(format!("{}: {}", code, message)),
        None => ProviderError::Transient(message),
    }
}

pub struct RunwayProvider {
    http: Client,
    settings: ProviderSettings,
    api_key: String,
}

impl RunwayProvider {
    pub fn new(settings: ProviderSettings) -> ProviderResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("RUNWAY_API_KEY is not set".to_string()))?;
        let http = build_client(settings.http_timeout)?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", API_VERSION)
    }

    async fn submit(&self, request: &ClipRequest) -> ProviderResult<String> {
        let body = TaskRequest {
            model: &self.settings.model,
            prompt_image: request.data_uri(),
            prompt_text: &request.prompt,
            ratio: ratio_for(request.aspect_ratio),
            duration: self.settings.raw_clip_duration.round() as u32,
        };

        let url = join_url(&self.settings.base_url, "/v1/image_to_video");
        let response = self.authorized(self.http.post(&url)).json(&body).send().await?;
        let created: TaskCreated = ensure_success(response).await?.json().await?;
        Ok(created.id)
    }

    async fn poll(&self, task_id: &str) -> ProviderResult<PollState<String>> {
        let url = join_url(&self.settings.base_url, &format!("/v1/tasks/{}", task_id));
        let response = self.authorized(self.http.get(&url)).send().await?;
        let status: TaskStatus = ensure_success(response).await?.json().await?;

        match status.status.as_str() {
            "SUCCEEDED" => status
                .output
                .first()
                .cloned()
                .map(PollState::Ready)
                .ok_or_else(|| {
                    ProviderError::InvalidResponse("task succeeded without output".to_string())
                }),
            "FAILED" => Err(task_failure(&status)),
            "CANCELLED" => Err(ProviderError::Transient("task was cancelled".to_string())),
            other => Ok(PollState::Pending(other.to_string())),
        }
    }
}

#[async_trait]
impl ClipProvider for RunwayProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Runway
    }

    fn raw_clip_duration(&self) -> f64 {
        self.settings.raw_clip_duration
    }

    async fn generate(&self, request: &ClipRequest) -> ProviderResult<GeneratedClip> {
        let task_id = self.submit(request).await?;
        info!(segment = request.order, task_id = %task_id, "Runway task submitted");

        let url = poll_until(self.settings.poll_interval, || self.poll(&task_id)).await?;
        download_clip(&self.http, &url, &request.output_path).await?;

        Ok(GeneratedClip {
            provider: ProviderKind::Runway,
            path: request.output_path.clone(),
            duration: self.settings.raw_clip_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_codes() {
        let status = TaskStatus {
            status: "FAILED".to_string(),
            output: vec![],
            failure: Some("flagged".to_string()),
            failure_code: Some("SAFETY.INPUT.IMAGE".to_string()),
        };
        assert!(matches!(task_failure(&status), ProviderError::Validation(_)));

        let status = TaskStatus {
            failure_code: Some("INTERNAL.BAD_OUTPUT".to_string()),
            ..status
        };
        assert!(matches!(task_failure(&status), ProviderError::Transient(_)));
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let settings = crate::ProvidersConfig::default().runway;
        assert!(matches!(
            RunwayProvider::new(settings),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_ratios() {
        assert_eq!(ratio_for(AspectRatio::Portrait), "720:1280");
        assert_eq!(ratio_for(AspectRatio::Square), "960:960");
    }
}
