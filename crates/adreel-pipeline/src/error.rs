//! Pipeline error types.

use adreel_media::MediaError;
use adreel_models::PlanError;
use adreel_providers::AllProvidersFailed;
use thiserror::Error;

pub type RunResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before any external call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Planning failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Clip generation failed for segment {order}: {source}")]
    ClipGenerationFailed {
        order: usize,
        source: AllProvidersFailed,
    },

    #[error("Encoding failed during {stage}: {source}")]
    EncodingFailed {
        stage: &'static str,
        source: MediaError,
    },

    #[error("Script generation failed: {0}")]
    ScriptFailed(String),

    #[error("Voiceover generation failed: {0}")]
    VoiceoverFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn script_failed(msg: impl Into<String>) -> Self {
        Self::ScriptFailed(msg.into())
    }

    pub fn voiceover_failed(msg: impl Into<String>) -> Self {
        Self::VoiceoverFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn encoding(stage: &'static str, source: MediaError) -> Self {
        Self::EncodingFailed { stage, source }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) | PipelineError::Plan(_) => "invalid_input",
            PipelineError::ClipGenerationFailed { .. } => "clip_generation",
            PipelineError::EncodingFailed { .. } => "encoding",
            PipelineError::ScriptFailed(_) => "script",
            PipelineError::VoiceoverFailed(_) => "voiceover",
            PipelineError::Config(_) => "config",
            PipelineError::Io(_) => "io",
        }
    }

    /// Encoder stderr tail, when the failure came from an encoder process.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            PipelineError::EncodingFailed { source, .. } => source.diagnostics(),
            _ => None,
        }
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Failure of the script or speech collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    /// Rate limits, server errors and dropped connections.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Http { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            CollaboratorError::Network(_) => true,
            _ => false,
        }
    }
}
