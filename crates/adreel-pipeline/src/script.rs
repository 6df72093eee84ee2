//! Voiceover script collaborator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::GeminiConfig;
use crate::error::{CollaboratorError, CollaboratorResult};
use crate::prompts::{script_prompt, ProductBrief};
use crate::retry::{retry_async, RetryConfig};

/// Writes the voiceover text for a reel.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, brief: &ProductBrief, duration_secs: f64) -> CollaboratorResult<String>;
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct ScriptPayload {
    script: String,
}

/// Strip a Markdown code fence around a JSON reply.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Pull the script out of a model reply.
///
/// Models asked for JSON sometimes answer in plain prose; that is used as-is.
fn parse_script(text: &str) -> CollaboratorResult<String> {
    let body = strip_code_fence(text);
    let script = match serde_json::from_str::<ScriptPayload>(body) {
        Ok(payload) => payload.script,
        Err(_) => body.to_string(),
    };
    let script = script.trim().to_string();
    if script.is_empty() {
        return Err(CollaboratorError::InvalidResponse(
            "model returned an empty script".to_string(),
        ));
    }
    Ok(script)
}

/// Gemini-backed script writer with model fallback.
pub struct GeminiScriptGenerator {
    api_key: String,
    base_url: String,
    models: Vec<String>,
    client: Client,
    retry: RetryConfig,
}

impl GeminiScriptGenerator {
    pub fn new(config: &GeminiConfig) -> CollaboratorResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| CollaboratorError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;
        if config.models.is_empty() {
            return Err(CollaboratorError::NotConfigured(
                "no Gemini models configured".to_string(),
            ));
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            models: config.models.clone(),
            client,
            retry: RetryConfig::new("gemini_script"),
        })
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry = self.retry.with_base_delay(delay);
        self
    }

    async fn call_gemini_api(&self, model: &str, prompt: &str) -> CollaboratorResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let text = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| CollaboratorError::InvalidResponse("no content in Gemini response".to_string()))?;

        parse_script(text)
    }
}

#[async_trait]
impl ScriptGenerator for GeminiScriptGenerator {
    async fn generate(&self, brief: &ProductBrief, duration_secs: f64) -> CollaboratorResult<String> {
        let prompt = script_prompt(brief, duration_secs);
        let mut last_error = None;

        for model in &self.models {
            let result = retry_async(&self.retry, CollaboratorError::is_retryable, || {
                self.call_gemini_api(model, &prompt)
            })
            .await
            .into_result();

            match result {
                Ok(script) => {
                    info!(model = %model, words = script.split_whitespace().count(), "Script generated");
                    return Ok(script);
                }
                Err(e) => {
                    warn!("Script generation failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| CollaboratorError::InvalidResponse("all Gemini models failed".to_string())))
    }
}
