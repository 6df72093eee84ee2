//! Pipeline run metrics.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub mod names {
    pub const RUNS_TOTAL: &str = "adreel_pipeline_runs_total";
    pub const RUN_DURATION_SECONDS: &str = "adreel_pipeline_run_duration_seconds";
    pub const STAGE_DURATION_SECONDS: &str = "adreel_pipeline_stage_duration_seconds";
    pub const COLLABORATOR_CALLS_TOTAL: &str = "adreel_collaborator_calls_total";
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_prometheus(addr: std::net::SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    Ok(())
}

/// `outcome` is `completed` or `aborted`.
pub fn record_run(outcome: &str, elapsed_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::RUNS_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(elapsed_secs);
}

pub fn record_stage(stage: &str, elapsed_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(elapsed_secs);
}

pub fn record_collaborator(collaborator: &str, success: bool) {
    let labels = [
        ("collaborator", collaborator.to_string()),
        ("outcome", if success { "success" } else { "failure" }.to_string()),
    ];
    counter!(names::COLLABORATOR_CALLS_TOTAL, &labels).increment(1);
}
