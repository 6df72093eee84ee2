//! Ordered provider fallback for one segment.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{AllProvidersFailed, ProviderError, ProviderFailure};
use crate::metrics;
use crate::provider::ClipProvider;
use crate::types::{ClipRequest, GeneratedClip};

/// A clip plus the failures that preceded it.
#[derive(Debug, Clone)]
pub struct ChainSuccess {
    pub clip: GeneratedClip,
    /// Earlier providers that failed, in the order they were tried
    pub failures: Vec<ProviderFailure>,
}

/// Tries providers strictly in priority order and stops at the first success.
///
/// Every attempt is bounded by `call_timeout`; running out counts as a
/// transient failure. Each provider gets exactly one attempt. Chains share
/// no mutable state, so one chain per segment can run concurrently.
#[derive(Clone)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn ClipProvider>>,
    call_timeout: Duration,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn ClipProvider>>, call_timeout: Duration) -> Self {
        Self {
            providers,
            call_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn generate(&self, request: &ClipRequest) -> Result<ChainSuccess, AllProvidersFailed> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let kind = provider.kind();
            let started = Instant::now();

            let result = match tokio::time::timeout(self.call_timeout, provider.generate(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.call_timeout.as_secs())),
            };
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(clip) => {
                    metrics::record_attempt(kind.as_str(), "success", elapsed);
                    info!(
                        segment = request.order,
                        provider = %kind,
                        elapsed_secs = elapsed,
                        skipped = failures.len(),
                        "Clip generated"
                    );
                    return Ok(ChainSuccess { clip, failures });
                }
                Err(e) => {
                    let failure = ProviderFailure::new(kind, &e);
                    metrics::record_attempt(kind.as_str(), failure.kind.as_str(), elapsed);
                    warn!(
                        segment = request.order,
                        provider = %kind,
                        kind = failure.kind.as_str(),
                        "Clip provider failed, trying next: {}",
                        e
                    );
                    // A half-written download must not be mistaken for the next provider's clip
                    let _ = tokio::fs::remove_file(&request.output_path).await;
                    failures.push(failure);
                }
            }
        }

        metrics::record_exhausted();
        Err(AllProvidersFailed { failures })
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.providers.iter().map(|p| p.kind()).collect();
        f.debug_struct("FallbackChain")
            .field("providers", &kinds)
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FailureKind, ProviderResult};
    use adreel_models::{AspectRatio, ProviderKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Succeed,
        Fail(fn() -> ProviderError),
        Hang,
    }

    struct FakeProvider {
        kind: ProviderKind,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(kind: ProviderKind, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                kind,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ClipProvider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        fn raw_clip_duration(&self) -> f64 {
            4.0
        }

        async fn generate(&self, request: &ClipRequest) -> ProviderResult<GeneratedClip> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Succeed => Ok(GeneratedClip {
                    provider: self.kind,
                    path: request.output_path.clone(),
                    duration: 4.0,
                }),
                Behaviour::Fail(make) => Err(make()),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Err(ProviderError::Transient("unreachable".to_string()))
                }
            }
        }
    }

    fn dynamic(provider: &Arc<FakeProvider>) -> Arc<dyn ClipProvider> {
        provider.clone()
    }

    fn request() -> ClipRequest {
        ClipRequest::new(
            1,
            b"png".to_vec(),
            "image/png",
            "slow push in",
            AspectRatio::Portrait,
            "/nonexistent/segment_01_raw.mp4",
        )
    }

    fn transient() -> ProviderError {
        ProviderError::Transient("HTTP 503".to_string())
    }

    fn auth() -> ProviderError {
        ProviderError::Auth("HTTP 401".to_string())
    }

    fn validation() -> ProviderError {
        ProviderError::Validation("HTTP 422".to_string())
    }

    #[tokio::test]
    async fn test_third_provider_succeeds_after_two_failures() {
        let runway = FakeProvider::new(ProviderKind::Runway, Behaviour::Fail(auth));
        let luma = FakeProvider::new(ProviderKind::Luma, Behaviour::Fail(transient));
        let replicate = FakeProvider::new(ProviderKind::Replicate, Behaviour::Succeed);

        let chain = FallbackChain::new(
            vec![dynamic(&runway), dynamic(&luma), dynamic(&replicate)],
            Duration::from_secs(5),
        );
        let success = chain.generate(&request()).await.unwrap();

        assert_eq!(success.clip.provider, ProviderKind::Replicate);
        assert_eq!(success.failures.len(), 2);
        assert_eq!(success.failures[0].provider, ProviderKind::Runway);
        assert_eq!(success.failures[0].kind, FailureKind::Auth);
        assert_eq!(success.failures[1].provider, ProviderKind::Luma);
    }

    #[tokio::test]
    async fn test_all_failures_are_kept_in_priority_order() {
        let chain = FallbackChain::new(
            vec![
                dynamic(&FakeProvider::new(ProviderKind::Runway, Behaviour::Fail(transient))),
                dynamic(&FakeProvider::new(ProviderKind::Luma, Behaviour::Fail(validation))),
                dynamic(&FakeProvider::new(ProviderKind::Replicate, Behaviour::Fail(auth))),
            ],
            Duration::from_secs(5),
        );

        let err = chain.generate(&request()).await.unwrap_err();
        let providers: Vec<_> = err.failures.iter().map(|f| f.provider).collect();
        assert_eq!(
            providers,
            vec![ProviderKind::Runway, ProviderKind::Luma, ProviderKind::Replicate]
        );
        let kinds: Vec<_> = err.failures.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![FailureKind::Transient, FailureKind::Validation, FailureKind::Auth]
        );
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let first = FakeProvider::new(ProviderKind::Runway, Behaviour::Succeed);
        let second = FakeProvider::new(ProviderKind::Luma, Behaviour::Succeed);

        let chain = FallbackChain::new(vec![dynamic(&first), dynamic(&second)], Duration::from_secs(5));
        let success = chain.generate(&request()).await.unwrap();

        assert!(success.failures.is_empty());
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_provider_is_not_retried() {
        let flaky = FakeProvider::new(ProviderKind::Runway, Behaviour::Fail(transient));
        let backup = FakeProvider::new(ProviderKind::Luma, Behaviour::Succeed);

        let chain = FallbackChain::new(vec![dynamic(&flaky), dynamic(&backup)], Duration::from_secs(5));
        chain.generate(&request()).await.unwrap();

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_through() {
        let chain = FallbackChain::new(
            vec![
                dynamic(&FakeProvider::new(ProviderKind::Runway, Behaviour::Hang)),
                dynamic(&FakeProvider::new(ProviderKind::Luma, Behaviour::Succeed)),
            ],
            Duration::from_secs(2),
        );

        let success = chain.generate(&request()).await.unwrap();
        assert_eq!(success.clip.provider, ProviderKind::Luma);
        assert_eq!(success.failures[0].kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain = FallbackChain::new(Vec::new(), Duration::from_secs(1));
        let err = chain.generate(&request()).await.unwrap_err();
        assert!(err.failures.is_empty());
        assert_eq!(err.to_string(), "no clip providers configured");
    }
}
