//! Structured run logging.
//!
//! Every line carries the run ID, the operation and the current stage so
//! concurrent runs can be told apart in aggregated logs. The run span records
//! the stage too, so encoder and provider logs emitted inside it inherit it.

use std::time::Instant;

use tracing::{error, field, info, warn, Span};

use adreel_models::RunId;

use crate::result::PipelineState;

/// Logger for one render run.
///
/// Tracks the stage the run is in and how long it has been there.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    operation: String,
    stage: PipelineState,
    stage_started: Instant,
    span: Span,
}

impl RunLogger {
    pub fn new(run_id: &RunId, operation: &str) -> Self {
        let run_id = run_id.to_string();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            operation = %operation,
            stage = field::Empty
        );
        Self {
            run_id,
            operation: operation.to_string(),
            stage: PipelineState::Idle,
            stage_started: Instant::now(),
            span,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    /// Move to `next` and return the seconds spent in the previous stage.
    pub fn enter_stage(&mut self, next: PipelineState) -> f64 {
        let elapsed = self.stage_started.elapsed().as_secs_f64();
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            stage = next.as_str(),
            previous = self.stage.as_str(),
            previous_secs = elapsed,
            "Run stage: {}", next
        );
        self.span.record("stage", next.as_str());
        self.stage = next;
        self.stage_started = Instant::now();
        elapsed
    }

    pub fn log_segment(&self, order: usize, message: &str) {
        info!(
            run_id = %self.run_id,
            stage = self.stage.as_str(),
            segment = order,
            "Segment {}: {}", order, message
        );
    }

    pub fn log_segment_warning(&self, order: usize, message: &str) {
        warn!(
            run_id = %self.run_id,
            stage = self.stage.as_str(),
            segment = order,
            "Segment {}: {}", order, message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            operation = %self.operation,
            stage = self.stage.as_str(),
            "Run warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            stage = self.stage.as_str(),
            "Run error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn stage(&self) -> PipelineState {
        self.stage
    }

    /// Span that nested stage logs inherit.
    pub fn span(&self) -> Span {
        self.span.clone()
    }
}
