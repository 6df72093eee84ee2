//! Bounded pool of concurrent encoder processes.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::progress::FfmpegProgress;

/// Default per-invocation wall-clock limit.
pub const DEFAULT_ENCODER_TIMEOUT_SECS: u64 = 300;

/// Limits how many FFmpeg processes run at once.
///
/// Clones share the same permits, so one pool can be handed to the
/// normalizer, assembler and muxer.
#[derive(Debug, Clone)]
pub struct EncoderPool {
    semaphore: Arc<Semaphore>,
    max_encoders: usize,
    timeout_secs: u64,
}

impl EncoderPool {
    pub fn new(max_encoders: usize) -> Self {
        let max_encoders = max_encoders.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_encoders)),
            max_encoders,
            timeout_secs: DEFAULT_ENCODER_TIMEOUT_SECS,
        }
    }

    /// One slot per available core.
    pub fn sized_to_cores() -> Self {
        Self::new(available_cores())
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn max_encoders(&self) -> usize {
        self.max_encoders
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Encoders currently running.
    pub fn active(&self) -> usize {
        self.max_encoders - self.semaphore.available_permits()
    }

    /// Run `cmd` once a slot is free.
    ///
    /// `stage` labels logs and metrics.
    pub async fn run(&self, stage: &str, cmd: &FfmpegCommand) -> MediaResult<()> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| MediaError::ResourceLimit("encoder pool closed".to_string()))?;

        debug!(
            stage = stage,
            output = %cmd.output_path().display(),
            active = self.active(),
            "Encoder slot acquired"
        );

        let started = Instant::now();
        let label = stage.to_string();
        let result = FfmpegRunner::new()
            .with_timeout(self.timeout_secs)
            .run_with_progress(cmd, move |progress| report_progress(&label, &progress))
            .await;
        let elapsed = started.elapsed().as_secs_f64();

        metrics::record_encode(stage, result.is_ok(), elapsed);
        if let Err(ref e) = result {
            warn!(stage = stage, elapsed_secs = elapsed, "Encoder failed: {}", e.summary());
        }

        result
    }
}

impl Default for EncoderPool {
    fn default() -> Self {
        Self::sized_to_cores()
    }
}

/// Log an encoder progress snapshot; the final one feeds the speed histogram.
fn report_progress(stage: &str, progress: &FfmpegProgress) {
    debug!(
        stage = stage,
        frame = progress.frame,
        out_time_ms = progress.out_time_ms,
        speed = progress.speed,
        "Encoder progress"
    );
    if let Some(speed) = final_speed(progress) {
        metrics::record_encode_speed(stage, speed);
    }
}

/// Realtime multiple of a finished encode, when FFmpeg reported one.
fn final_speed(progress: &FfmpegProgress) -> Option<f64> {
    (progress.is_complete && progress.speed > 0.0).then_some(progress.speed)
}

/// Number of cores, falling back to 1 when unknown.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
