//! Prediction provider: create a model prediction, poll the prediction.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use adreel_models::ProviderKind;

use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};
use crate::http::{build_client, download_clip, ensure_success, join_url, poll_until, PollState};
use crate::provider::ClipProvider;
use crate::types::{ClipRequest, GeneratedClip};

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    image: String,
    prompt: &'a str,
    aspect_ratio: &'static str,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Value,
    error: Option<Value>,
}

/// Output is a URL or a list of URLs depending on the model.
fn output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(url) => Some(url.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

pub struct ReplicateProvider {
    http: Client,
    settings: ProviderSettings,
    api_key: String,
}

impl ReplicateProvider {
    pub fn new(settings: ProviderSettings) -> ProviderResult<Self> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            ProviderError::NotConfigured("REPLICATE_API_TOKEN is not set".to_string())
        })?;
        let http = build_client(settings.http_timeout)?;
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    async fn create(&self, request: &ClipRequest) -> ProviderResult<String> {
        let body = PredictionRequest {
            input: PredictionInput {
                image: request.data_uri(),
                prompt: &request.prompt,
                aspect_ratio: request.aspect_ratio.as_str(),
            },
        };

        let url = join_url(
            &self.settings.base_url,
            &format!("/v1/models/{}/predictions", self.settings.model),
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let prediction: Prediction = ensure_success(response).await?.json().await?;
        Ok(prediction.id)
    }

    async fn poll(&self, prediction_id: &str) -> ProviderResult<PollState<String>> {
        let url = join_url(
            &self.settings.base_url,
            &format!("/v1/predictions/{}", prediction_id),
        );
        let response = self.http.get(&url).bearer_auth(&self.api_key).send().await?;
        let prediction: Prediction = ensure_success(response).await?.json().await?;

        match prediction.status.as_str() {
            "succeeded" => output_url(&prediction.output)
                .map(PollState::Ready)
                .ok_or_else(|| {
                    ProviderError::InvalidResponse("prediction succeeded without output".to_string())
                }),
            "failed" | "canceled" => {
                let message = match prediction.error {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => format!("prediction {}", prediction.status),
                };
                Err(ProviderError::Transient(message))
            }
            other => Ok(PollState::Pending(other.to_string())),
        }
    }
}

#[async_trait]
impl ClipProvider for ReplicateProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }

    fn raw_clip_duration(&self) -> f64 {
        self.settings.raw_clip_duration
    }

    async fn generate(&self, request: &ClipRequest) -> ProviderResult<GeneratedClip> {
        let prediction_id = self.create(request).await?;
        info!(segment = request.order, prediction_id = %prediction_id, "Replicate prediction created");

        let url = poll_until(self.settings.poll_interval, || self.poll(&prediction_id)).await?;
        download_clip(&self.http, &url, &request.output_path).await?;

        Ok(GeneratedClip {
            provider: ProviderKind::Replicate,
            path: request.output_path.clone(),
            duration: self.settings.raw_clip_duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_shapes() {
        assert_eq!(
            output_url(&json!("https://x/clip.mp4")).as_deref(),
            Some("https://x/clip.mp4")
        );
        assert_eq!(
            output_url(&json!(["https://x/a.mp4", "https://x/b.mp4"])).as_deref(),
            Some("https://x/a.mp4")
        );
        assert_eq!(output_url(&json!(null)), None);
        assert_eq!(output_url(&json!({"video": "x"})), None);
    }
}
