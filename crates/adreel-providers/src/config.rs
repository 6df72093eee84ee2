//! Provider configuration from environment variables.

use std::time::Duration;

use adreel_models::ProviderKind;

/// Per-call limit covering submit, polling and download.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 90;

/// Limit for a single HTTP request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Settings for one provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Absent means the provider is not registered
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Fixed output length in seconds
    pub raw_clip_duration: f64,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl ProviderSettings {
    fn defaults(kind: ProviderKind) -> Self {
        let (base_url, model, raw_clip_duration) = match kind {
            ProviderKind::Runway => ("https://api.dev.runwayml.com", "gen4_turbo", 5.0),
            ProviderKind::Luma => ("https://api.lumalabs.ai", "ray-2", 5.0),
            ProviderKind::Replicate => {
                ("https://api.replicate.com", "wavespeedai/wan-2.1-i2v-480p", 4.0)
            }
        };
        Self {
            api_key: None,
            base_url: base_url.to_string(),
            model: model.to_string(),
            raw_clip_duration,
            poll_interval: Duration::from_secs(2),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Read `<PREFIX>_API_KEY`, `_BASE_URL`, `_MODEL`, `_CLIP_DURATION`, `_POLL_MS`.
    fn from_env(kind: ProviderKind) -> Self {
        let defaults = Self::defaults(kind);
        let prefix = env_prefix(kind);
        let var = |suffix: &str| std::env::var(format!("{}_{}", prefix, suffix)).ok();

        // Replicate documents its credential as an API token
        let api_key = var("API_KEY")
            .or_else(|| {
                matches!(kind, ProviderKind::Replicate)
                    .then(|| var("API_TOKEN"))
                    .flatten()
            })
            .filter(|k| !k.trim().is_empty());

        Self {
            api_key,
            base_url: var("BASE_URL").unwrap_or(defaults.base_url),
            model: var("MODEL").unwrap_or(defaults.model),
            raw_clip_duration: var("CLIP_DURATION")
                .and_then(|s| s.parse().ok())
                .filter(|d: &f64| *d > 0.0)
                .unwrap_or(defaults.raw_clip_duration),
            poll_interval: var("POLL_MS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            http_timeout: defaults.http_timeout,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn env_prefix(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::Runway => "RUNWAY",
        ProviderKind::Luma => "LUMA",
        ProviderKind::Replicate => "REPLICATE",
    }
}

/// Configuration for every clip provider.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    pub runway: ProviderSettings,
    pub luma: ProviderSettings,
    pub replicate: ProviderSettings,
    /// Per-call limit; hitting it counts as a transient failure
    pub call_timeout: Duration,
    /// Fallback order
    pub priority: Vec<ProviderKind>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            runway: ProviderSettings::defaults(ProviderKind::Runway),
            luma: ProviderSettings::defaults(ProviderKind::Luma),
            replicate: ProviderSettings::defaults(ProviderKind::Replicate),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            priority: ProviderKind::ALL.to_vec(),
        }
    }
}

impl ProvidersConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let priority = std::env::var("ADREEL_PROVIDER_ORDER")
            .ok()
            .map(|s| ProviderKind::parse_priority(&s))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| ProviderKind::ALL.to_vec());

        Self {
            runway: ProviderSettings::from_env(ProviderKind::Runway),
            luma: ProviderSettings::from_env(ProviderKind::Luma),
            replicate: ProviderSettings::from_env(ProviderKind::Replicate),
            call_timeout: Duration::from_secs(
                std::env::var("ADREEL_PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
            ),
            priority,
        }
    }

    pub fn settings(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Runway => &self.runway,
            ProviderKind::Luma => &self.luma,
            ProviderKind::Replicate => &self.replicate,
        }
    }

    /// Providers with credentials, in priority order.
    pub fn configured(&self) -> Vec<ProviderKind> {
        self.priority
            .iter()
            .copied()
            .filter(|kind| self.settings(*kind).is_configured())
            .collect()
    }
}
