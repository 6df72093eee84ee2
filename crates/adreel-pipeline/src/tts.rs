//! Voiceover speech collaborator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::config::SpeechConfig;
use crate::error::{CollaboratorError, CollaboratorResult};
use crate::retry::{retry_async, RetryConfig};

/// Turns script text into an audio file.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Write speech for `text` to `output` and return the written path.
    async fn synthesize(&self, text: &str, output: &Path) -> CollaboratorResult<PathBuf>;
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

/// Client for an OpenAI-compatible `/v1/audio/speech` endpoint.
pub struct HttpSpeechClient {
    api_key: String,
    base_url: String,
    model: String,
    voice: String,
    client: Client,
    retry: RetryConfig,
}

impl HttpSpeechClient {
    pub fn new(config: &SpeechConfig) -> CollaboratorResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| CollaboratorError::NotConfigured("TTS_API_KEY is not set".to_string()))?;
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            client,
            retry: RetryConfig::new("speech"),
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry = self.retry.with_base_delay(delay);
        self
    }

    async fn request_speech(&self, text: &str) -> CollaboratorResult<Vec<u8>> {
        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "speech endpoint returned no audio".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TextToSpeech for HttpSpeechClient {
    async fn synthesize(&self, text: &str, output: &Path) -> CollaboratorResult<PathBuf> {
        if text.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "cannot synthesize an empty script".to_string(),
            ));
        }

        let audio = retry_async(&self.retry, CollaboratorError::is_retryable, || {
            self.request_speech(text)
        })
        .await
        .into_result()?;

        tokio::fs::write(output, &audio).await?;
        info!(bytes = audio.len(), path = %output.display(), "Voiceover written");
        Ok(output.to_path_buf())
    }
}
