//! Encoder metrics.
//!
//! - Encoder invocations by stage and outcome
//! - Encode wall time by stage
//! - Encode speed (realtime multiple) by stage
//! - Degraded segment normalizations

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// FFmpeg invocations by stage and outcome.
    pub const ENCODES_TOTAL: &str = "adreel_encodes_total";

    /// Encode wall time in seconds by stage.
    pub const ENCODE_SECONDS: &str = "adreel_encode_seconds";

    /// Final `-progress` speed of each encode by stage.
    pub const ENCODE_SPEED: &str = "adreel_encode_speed";

    /// Segments that fell back to their raw clip.
    pub const DEGRADED_SEGMENTS_TOTAL: &str = "adreel_degraded_segments_total";
}

/// Record a finished encoder invocation.
pub fn record_encode(stage: &str, success: bool, elapsed_secs: f64) {
    let outcome = if success { "success" } else { "failure" };

    counter!(
        names::ENCODES_TOTAL,
        "stage" => stage.to_string(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(
        names::ENCODE_SECONDS,
        "stage" => stage.to_string()
    )
    .record(elapsed_secs);
}

/// Record how fast a finished encode ran relative to realtime.
pub fn record_encode_speed(stage: &str, speed: f64) {
    histogram!(
        names::ENCODE_SPEED,
        "stage" => stage.to_string()
    )
    .record(speed);
}

/// Record a segment whose normalization degraded.
pub fn record_degraded(method: &str) {
    counter!(
        names::DEGRADED_SEGMENTS_TOTAL,
        "method" => method.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::ENCODES_TOTAL.starts_with("adreel_"));
        assert!(names::ENCODE_SECONDS.ends_with("_seconds"));
        assert!(names::DEGRADED_SEGMENTS_TOTAL.ends_with("_total"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_encode("normalize", true, 0.5);
        record_encode_speed("assemble", 3.2);
        record_degraded("rescale");
    }
}
