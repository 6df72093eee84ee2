//! Pipeline configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use adreel_media::available_cores;
use adreel_media::pool::DEFAULT_ENCODER_TIMEOUT_SECS;
use adreel_models::{
    AspectRatio, DEFAULT_FRAME_RATE, DEFAULT_TOTAL_DURATION, DEFAULT_TRANSITION_DURATION,
};

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_flag(key: &str) -> Option<bool> {
    env_string(key).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

/// Render configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent of the per-run scratch directories
    pub work_dir: PathBuf,
    /// Where finished (and aborted) runs are kept
    pub output_dir: PathBuf,
    pub total_duration: f64,
    pub transition_duration: f64,
    pub transitions_enabled: bool,
    pub frame_rate: u32,
    pub aspect_ratio: AspectRatio,
    /// Maximum concurrent FFmpeg processes across all runs
    pub max_encoder_processes: usize,
    pub encoder_timeout: Duration,
    pub watermark_path: Option<PathBuf>,
    pub generate_thumbnail: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("adreel"),
            output_dir: PathBuf::from("./adreel-output"),
            total_duration: DEFAULT_TOTAL_DURATION,
            transition_duration: DEFAULT_TRANSITION_DURATION,
            transitions_enabled: true,
            frame_rate: DEFAULT_FRAME_RATE,
            aspect_ratio: AspectRatio::Portrait,
            max_encoder_processes: available_cores(),
            encoder_timeout: Duration::from_secs(DEFAULT_ENCODER_TIMEOUT_SECS),
            watermark_path: None,
            generate_thumbnail: true,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: env_string("ADREEL_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            output_dir: env_string("ADREEL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            total_duration: env_parse("ADREEL_TOTAL_DURATION").unwrap_or(defaults.total_duration),
            transition_duration: env_parse("ADREEL_TRANSITION_DURATION")
                .unwrap_or(defaults.transition_duration),
            transitions_enabled: env_flag("ADREEL_TRANSITIONS")
                .unwrap_or(defaults.transitions_enabled),
            frame_rate: env_parse("ADREEL_FRAME_RATE").unwrap_or(defaults.frame_rate),
            aspect_ratio: env_parse("ADREEL_ASPECT_RATIO").unwrap_or(defaults.aspect_ratio),
            max_encoder_processes: env_parse("ADREEL_MAX_ENCODERS")
                .unwrap_or(defaults.max_encoder_processes),
            encoder_timeout: env_parse("ADREEL_ENCODER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.encoder_timeout),
            watermark_path: env_string("ADREEL_WATERMARK_PATH").map(PathBuf::from),
            generate_thumbnail: env_flag("ADREEL_THUMBNAIL").unwrap_or(defaults.generate_thumbnail),
        }
    }
}

/// Models tried in order for script generation.
pub const DEFAULT_GEMINI_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub models: Vec<String>,
    pub request_timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            models: DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_string("GEMINI_API_KEY"),
            base_url: env_string("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            models: env_string("GEMINI_MODELS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.models),
            request_timeout: env_parse("GEMINI_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

/// OpenAI-compatible speech endpoint.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub request_timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl SpeechConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_string("TTS_API_KEY"),
            base_url: env_string("TTS_BASE_URL").unwrap_or(defaults.base_url),
            model: env_string("TTS_MODEL").unwrap_or(defaults.model),
            voice: env_string("TTS_VOICE").unwrap_or(defaults.voice),
            request_timeout: env_parse("TTS_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}
