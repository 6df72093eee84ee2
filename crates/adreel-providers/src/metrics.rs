//! Provider metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Provider attempts by provider and outcome.
    pub const ATTEMPTS_TOTAL: &str = "adreel_provider_attempts_total";

    /// Provider call latency in seconds by provider.
    pub const LATENCY_SECONDS: &str = "adreel_provider_latency_seconds";

    /// Segments for which every provider failed.
    pub const EXHAUSTED_TOTAL: &str = "adreel_provider_chain_exhausted_total";
}

/// Record one provider attempt. `outcome` is `success` or a failure kind.
pub fn record_attempt(provider: &str, outcome: &str, latency_secs: f64) {
    counter!(
        names::ATTEMPTS_TOTAL,
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "provider" => provider.to_string()
    )
    .record(latency_secs);
}

pub fn record_exhausted() {
    counter!(names::EXHAUSTED_TOTAL).increment(1);
}
