//! Provider error types.

use std::fmt;

use adreel_models::ProviderKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing or rejected credential. Never retried.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The service rejected the image or prompt.
    #[error("Request rejected: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    Transient(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Classify an HTTP error response.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, truncate(body.trim(), 300))
        };

        match status {
            401 | 403 => ProviderError::Auth(message),
            400 | 404 | 413 | 415 | 422 => ProviderError::Validation(message),
            408 | 429 | 500..=599 => ProviderError::Transient(message),
            _ => ProviderError::InvalidResponse(message),
        }
    }

    /// Errors another attempt might not hit.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Transient(_) | ProviderError::Timeout(_) | ProviderError::Network(_)
        )
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Auth(_) | ProviderError::NotConfigured(_) => FailureKind::Auth,
            ProviderError::Validation(_) => FailureKind::Validation,
            ProviderError::Timeout(_) => FailureKind::Timeout,
            ProviderError::Transient(_) | ProviderError::Network(_) => FailureKind::Transient,
            ProviderError::InvalidResponse(_) | ProviderError::Json(_) | ProviderError::Io(_) => {
                FailureKind::Other
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Coarse failure class, for reports and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    Validation,
    Transient,
    Timeout,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Auth => "auth",
            FailureKind::Validation => "validation",
            FailureKind::Transient => "transient",
            FailureKind::Timeout => "timeout",
            FailureKind::Other => "other",
        }
    }
}

/// One provider's failed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: ProviderKind, error: &ProviderError) -> Self {
        Self {
            provider,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.provider, self.kind.as_str(), self.message)
    }
}

/// Every provider in the chain failed. Failures are in priority order.
#[derive(Debug, Clone, PartialEq)]
pub struct AllProvidersFailed {
    pub failures: Vec<ProviderFailure>,
}

impl fmt::Display for AllProvidersFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no clip providers configured");
        }
        write!(f, "all {} clip providers failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AllProvidersFailed {}
