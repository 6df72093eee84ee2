//! Ad reel render pipeline.
//!
//! This crate provides:
//! - The run orchestrator and its stage machine
//! - Structured results with partial artifacts on failure
//! - Script and speech collaborators
//! - Per-run scratch workspaces
//! - Configuration, logging and metrics shared by the binaries

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod prompts;
pub mod result;
pub mod retry;
pub mod script;
pub mod tts;
pub mod workspace;

pub use config::{GeminiConfig, PipelineConfig, SpeechConfig};
pub use error::{CollaboratorError, CollaboratorResult, PipelineError, RunResult};
pub use logging::RunLogger;
pub use orchestrator::{PipelineOrchestrator, RenderRequest};
pub use prompts::{motion_prompt, ProductBrief, ShotPosition};
pub use result::{
    AbortedRun, ClipArtifact, CompletedRun, DurationReport, PartialArtifacts, PipelineResult,
    PipelineState, SegmentFailure, SegmentReport,
};
pub use script::{GeminiScriptGenerator, ScriptGenerator};
pub use tts::{HttpSpeechClient, TextToSpeech};
pub use workspace::RunWorkspace;
