//! Image-to-video clip providers.
//!
//! Each adapter wraps one remote generation service behind the
//! [`ClipProvider`] trait. Adapters make one attempt per call; ordered
//! fallback and error aggregation live in [`FallbackChain`].

pub mod chain;
pub mod config;
pub mod error;
mod http;
pub mod luma;
pub mod metrics;
pub mod provider;
pub mod registry;
pub mod replicate;
pub mod runway;
pub mod types;

pub use chain::{ChainSuccess, FallbackChain};
pub use config::{ProviderSettings, ProvidersConfig};
pub use error::{AllProvidersFailed, FailureKind, ProviderError, ProviderFailure, ProviderResult};
pub use luma::LumaProvider;
pub use provider::ClipProvider;
pub use registry::ProviderRegistry;
pub use replicate::ReplicateProvider;
pub use runway::RunwayProvider;
pub use types::{mime_type_for, ClipRequest, GeneratedClip};
