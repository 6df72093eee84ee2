//! Render run orchestration.
//!
//! One run moves through the stages of [`PipelineState`]:
//!
//! 1. Plan segment durations (input errors are returned before any call)
//! 2. Generate every clip concurrently while the script is written
//! 3. Normalize segments (speech synthesis starts in the background)
//! 4. Assemble the silent timeline
//! 5. Wait for the voiceover, then mux
//!
//! A failure after planning ends in [`PipelineResult::Aborted`] with the
//! artifacts produced so far moved out of the scratch directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};

use adreel_media::{
    generate_poster, AssembledVideo, AudioMuxer, EncoderPool, SegmentNormalizer, TimelineAssembler,
    WatermarkConfig,
};
use adreel_models::{
    AspectRatio, DurationPlanner, EncodingConfig, RunId, Timeline, MAX_IMAGES, MIN_IMAGES,
};
use adreel_providers::{ClipRequest, ProviderFailure, ProviderRegistry};

use crate::config::PipelineConfig;
use crate::error::{CollaboratorResult, PipelineError, RunResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::prompts::{motion_prompt, ProductBrief};
use crate::result::{
    AbortedRun, ClipArtifact, CompletedRun, DurationReport, PartialArtifacts, PipelineResult,
    PipelineState, SegmentFailure, SegmentReport,
};
use crate::script::ScriptGenerator;
use crate::tts::TextToSpeech;
use crate::workspace::RunWorkspace;

/// What to render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub brief: ProductBrief,
    /// Source images in playback order
    pub images: Vec<PathBuf>,
    /// Overrides the configured total duration
    pub total_duration: Option<f64>,
    /// Overrides the configured aspect ratio
    pub aspect_ratio: Option<AspectRatio>,
}

impl RenderRequest {
    pub fn new(brief: ProductBrief, images: Vec<PathBuf>) -> Self {
        Self {
            brief,
            images,
            total_duration: None,
            aspect_ratio: None,
        }
    }

    pub fn with_total_duration(mut self, seconds: f64) -> Self {
        self.total_duration = Some(seconds);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect: AspectRatio) -> Self {
        self.aspect_ratio = Some(aspect);
        self
    }
}

/// Per-run bookkeeping. Dropping it removes the scratch directory.
struct RunContext {
    run_id: RunId,
    logger: RunLogger,
    workspace: RunWorkspace,
    started_at: DateTime<Utc>,
    started: Instant,
}

/// Artifacts in the scratch directory at the moment a stage failed.
#[derive(Default)]
struct Leftovers {
    script: Option<String>,
    silent_video: Option<PathBuf>,
    audio: Option<PathBuf>,
    segment_failures: Vec<SegmentFailure>,
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    registry: Arc<ProviderRegistry>,
    script_generator: Arc<dyn ScriptGenerator>,
    speech: Arc<dyn TextToSpeech>,
    pool: EncoderPool,
    encoding: EncodingConfig,
    state_tx: watch::Sender<PipelineState>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        registry: Arc<ProviderRegistry>,
        script_generator: Arc<dyn ScriptGenerator>,
        speech: Arc<dyn TextToSpeech>,
    ) -> Self {
        let pool = EncoderPool::new(config.max_encoder_processes)
            .with_timeout(config.encoder_timeout.as_secs());
        let (state_tx, _) = watch::channel(PipelineState::Idle);

        Self {
            config,
            registry,
            script_generator,
            speech,
            pool,
            encoding: EncodingConfig::default(),
            state_tx,
        }
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Follow the stage of the most recent run.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state_tx.borrow()
    }

    pub async fn run(&self, request: RenderRequest) -> RunResult<PipelineResult> {
        self.run_with_id(RunId::new(), request).await
    }

    /// Run with a caller-chosen ID.
    ///
    /// `Err` is returned only for input and setup problems found before
    /// any external call. Everything later ends in a [`PipelineResult`].
    pub async fn run_with_id(&self, run_id: RunId, request: RenderRequest) -> RunResult<PipelineResult> {
        let logger = RunLogger::new(&run_id, "render");
        let span = logger.span();
        self.execute(run_id, logger, request).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: RunId,
        mut logger: RunLogger,
        request: RenderRequest,
    ) -> RunResult<PipelineResult> {
        logger.log_start(&format!(
            "{} images for \"{}\"",
            request.images.len(),
            request.brief.product_name
        ));
        logger.enter_stage(PipelineState::PlanningDurations);
        self.state_tx.send_replace(PipelineState::PlanningDurations);

        let (mut timeline, workspace, requests) = match self.prepare(&run_id, &request).await {
            Ok(prepared) => prepared,
            Err(e) => {
                logger.log_error(&format!("rejected: {}", e));
                self.state_tx.send_replace(PipelineState::Idle);
                return Err(e);
            }
        };

        let mut ctx = RunContext {
            run_id,
            logger,
            workspace,
            started_at: Utc::now(),
            started: Instant::now(),
        };

        // Clips and script
        self.advance(&mut ctx, PipelineState::GeneratingClips);
        let chain = self.registry.chain();
        let script_duration = timeline.expected_output_duration();
        let (clip_results, script_result) = tokio::join!(
            join_all(requests.iter().map(|r| chain.generate(r))),
            self.generate_script(&request.brief, script_duration),
        );

        let mut fallback_failures: Vec<Vec<ProviderFailure>> = vec![Vec::new(); timeline.segments.len()];
        let mut segment_failures = Vec::new();
        let mut clip_error = None;
        for (index, (segment, result)) in timeline.segments.iter_mut().zip(clip_results).enumerate() {
            match result {
                Ok(success) => {
                    info!(
                        segment = segment.order(),
                        provider = %success.clip.provider,
                        fallbacks = success.failures.len(),
                        "Clip ready"
                    );
                    segment.attach_raw_clip(
                        &success.clip.path,
                        success.clip.duration,
                        success.clip.provider,
                    );
                    fallback_failures[index] = success.failures;
                }
                Err(all_failed) => {
                    segment_failures.push(SegmentFailure {
                        order: segment.order(),
                        failures: all_failed.failures.clone(),
                    });
                    if clip_error.is_none() {
                        clip_error = Some(PipelineError::ClipGenerationFailed {
                            order: segment.order(),
                            source: all_failed,
                        });
                    }
                }
            }
        }

        let (script, script_error) = match script_result {
            Ok(script) => (Some(script), None),
            Err(e) => (None, Some(e)),
        };
        if let Some(error) = clip_error.or(script_error) {
            let leftovers = Leftovers {
                script,
                segment_failures,
                ..Default::default()
            };
            return Ok(self.abort(ctx, &timeline, error, leftovers).await);
        }
        let script = script.unwrap_or_default();

        // Speech synthesis overlaps normalization and assembly.
        let voiceover = self.spawn_voiceover(script.clone(), ctx.workspace.voiceover_path());

        self.advance(&mut ctx, PipelineState::NormalizingSegments);
        timeline.sort_segments();
        let normalizer =
            SegmentNormalizer::new(self.pool.clone(), self.encoding.clone(), timeline.frame_rate);
        let work_dir = ctx.workspace.path().to_path_buf();
        let normalized = join_all(
            timeline
                .segments
                .iter_mut()
                .map(|segment| normalizer.normalize(segment, &work_dir)),
        )
        .await;
        if let Some(e) = normalized.into_iter().find_map(Result::err) {
            let leftovers = Leftovers {
                script: Some(script),
                audio: join_voiceover(voiceover).await.ok(),
                ..Default::default()
            };
            let error = PipelineError::encoding("normalize", e);
            return Ok(self.abort(ctx, &timeline, error, leftovers).await);
        }
        for segment in &timeline.segments {
            match (segment.degraded(), segment.normalization()) {
                (Some(degraded), _) => ctx.logger.log_segment_warning(
                    segment.order(),
                    &format!("{} failed, using the raw clip", degraded.attempted.as_str()),
                ),
                (None, Some(method)) => ctx.logger.log_segment(segment.order(), method.as_str()),
                (None, None) => {}
            }
        }

        self.advance(&mut ctx, PipelineState::AssemblingTimeline);
        let assembler = TimelineAssembler::new(self.pool.clone(), self.encoding.clone());
        let assembled = match assembler
            .assemble(&timeline, &ctx.workspace.assembled_path())
            .await
        {
            Ok(assembled) => assembled,
            Err(e) => {
                let leftovers = Leftovers {
                    script: Some(script),
                    audio: join_voiceover(voiceover).await.ok(),
                    ..Default::default()
                };
                let error = PipelineError::encoding("assemble", e);
                return Ok(self.abort(ctx, &timeline, error, leftovers).await);
            }
        };

        self.advance(&mut ctx, PipelineState::GeneratingVoiceover);
        let audio = match join_voiceover(voiceover).await {
            Ok(audio) => audio,
            Err(error) => {
                let leftovers = Leftovers {
                    script: Some(script),
                    silent_video: Some(assembled.path.clone()),
                    ..Default::default()
                };
                return Ok(self.abort(ctx, &timeline, error, leftovers).await);
            }
        };

        self.advance(&mut ctx, PipelineState::Muxing);
        let final_path = ctx.workspace.final_path();
        if let Err(e) = self.muxer().mux(&assembled.path, &audio, &final_path).await {
            let leftovers = Leftovers {
                script: Some(script),
                silent_video: Some(assembled.path.clone()),
                audio: Some(audio),
                ..Default::default()
            };
            let error = PipelineError::encoding("mux", e);
            return Ok(self.abort(ctx, &timeline, error, leftovers).await);
        }

        let poster = self.poster(&ctx, &final_path).await;
        let video_path = match ctx.workspace.keep(&final_path).await {
            Ok(path) => path,
            Err(e) => {
                let leftovers = Leftovers {
                    script: Some(script),
                    silent_video: Some(assembled.path.clone()),
                    audio: Some(audio),
                    ..Default::default()
                };
                let error = PipelineError::Io(std::io::Error::other(e.to_string()));
                return Ok(self.abort(ctx, &timeline, error, leftovers).await);
            }
        };
        let poster_path = ctx.workspace.keep_if_present(poster.as_deref()).await;

        Ok(self.complete(ctx, &timeline, &assembled, video_path, poster_path, script, fallback_failures))
    }

    /// Validate input, plan durations, and read every image.
    async fn prepare(
        &self,
        run_id: &RunId,
        request: &RenderRequest,
    ) -> RunResult<(Timeline, RunWorkspace, Vec<ClipRequest>)> {
        if request.brief.product_name.trim().is_empty() {
            return Err(PipelineError::invalid_input("product name is required"));
        }
        let count = request.images.len();
        if !(MIN_IMAGES..=MAX_IMAGES).contains(&count) {
            return Err(PipelineError::invalid_input(format!(
                "expected {} to {} images, got {}",
                MIN_IMAGES, MAX_IMAGES, count
            )));
        }
        if self.registry.is_empty() {
            return Err(PipelineError::config_error("no clip providers configured"));
        }

        let total_duration = request.total_duration.unwrap_or(self.config.total_duration);
        let aspect = request.aspect_ratio.unwrap_or(self.config.aspect_ratio);

        // No fade budget when segments are joined back to back
        let transition = if self.config.transitions_enabled {
            self.config.transition_duration
        } else {
            0.0
        };
        let plan = DurationPlanner::new(transition).plan(count, total_duration)?;
        let timeline = Timeline::from_plan(
            &plan,
            &request.images,
            aspect,
            self.config.frame_rate,
            self.config.transitions_enabled,
        )?;
        info!(
            segments = count,
            segment_duration = plan.segment_durations[0],
            expected_output = timeline.expected_output_duration(),
            "Planned timeline"
        );

        let workspace = RunWorkspace::create(run_id, &self.config.work_dir, &self.config.output_dir)?;

        let mut requests = Vec::with_capacity(count);
        for segment in &timeline.segments {
            let order = segment.order();
            let request = ClipRequest::from_image_file(
                order,
                segment.source_image_path(),
                motion_prompt(&request.brief, order, count),
                aspect,
                workspace.raw_clip_path(order),
            )
            .await
            .map_err(|e| {
                PipelineError::invalid_input(format!(
                    "image {} ({}): {}",
                    order,
                    segment.source_image_path().display(),
                    e
                ))
            })?;
            requests.push(request);
        }

        Ok((timeline, workspace, requests))
    }

    fn advance(&self, ctx: &mut RunContext, next: PipelineState) {
        let finished = ctx.logger.stage();
        let elapsed = ctx.logger.enter_stage(next);
        metrics::record_stage(finished.as_str(), elapsed);
        self.state_tx.send_replace(next);
    }

    async fn generate_script(&self, brief: &ProductBrief, duration_secs: f64) -> RunResult<String> {
        let result = self.script_generator.generate(brief, duration_secs).await;
        metrics::record_collaborator("script", result.is_ok());
        result.map_err(|e| PipelineError::script_failed(e.to_string()))
    }

    fn spawn_voiceover(&self, script: String, output: PathBuf) -> JoinHandle<CollaboratorResult<PathBuf>> {
        let speech = Arc::clone(&self.speech);
        tokio::spawn(
            async move { speech.synthesize(&script, &output).await }.in_current_span(),
        )
    }

    fn muxer(&self) -> AudioMuxer {
        let muxer = AudioMuxer::new(self.pool.clone(), self.encoding.clone());
        match &self.config.watermark_path {
            Some(path) => {
                let watermark = WatermarkConfig::new(path);
                if let Err(e) = watermark.validate() {
                    warn!("Watermark disabled: {}", e);
                }
                muxer.with_watermark(watermark)
            }
            None => muxer,
        }
    }

    /// Poster frame; a failure here never fails the run.
    async fn poster(&self, ctx: &RunContext, video: &Path) -> Option<PathBuf> {
        if !self.config.generate_thumbnail {
            return None;
        }
        let poster = ctx.workspace.poster_path();
        match generate_poster(&self.pool, video, &poster).await {
            Ok(()) => Some(poster),
            Err(e) => {
                ctx.logger.log_warning(&format!("poster frame skipped: {}", e.summary()));
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn complete(
        &self,
        mut ctx: RunContext,
        timeline: &Timeline,
        assembled: &AssembledVideo,
        video_path: PathBuf,
        poster_path: Option<PathBuf>,
        script: String,
        fallback_failures: Vec<Vec<ProviderFailure>>,
    ) -> PipelineResult {
        self.advance(&mut ctx, PipelineState::Done);

        let segments = timeline
            .segments
            .iter()
            .zip(fallback_failures)
            .map(|(segment, failures)| SegmentReport::from_segment(segment, failures))
            .collect();
        let duration = DurationReport {
            expected: assembled.expected_duration,
            measured: assembled.measured_duration,
            drift: assembled.drift(),
            within_tolerance: !assembled.exceeds_tolerance(),
        };

        let elapsed = ctx.started.elapsed().as_secs_f64();
        metrics::record_run("completed", elapsed);
        ctx.logger.log_completion(&format!(
            "{} in {:.1}s",
            video_path.display(),
            elapsed
        ));

        PipelineResult::Completed(CompletedRun {
            run_id: ctx.run_id.clone(),
            video_path,
            poster_path,
            script,
            duration,
            segments,
            started_at: ctx.started_at,
            finished_at: Utc::now(),
        })
    }

    /// End the run, moving every leftover artifact to the output directory.
    async fn abort(
        &self,
        ctx: RunContext,
        timeline: &Timeline,
        error: PipelineError,
        leftovers: Leftovers,
    ) -> PipelineResult {
        let stage = ctx.logger.stage();
        ctx.logger.log_error(&format!("aborted: {}", error));
        for failure in &leftovers.segment_failures {
            ctx.logger.log_segment_warning(
                failure.order,
                &format!("no provider produced a clip ({} attempts)", failure.failures.len()),
            );
        }

        let mut raw_clips = Vec::new();
        let mut normalized_clips = Vec::new();
        for segment in &timeline.segments {
            // A degraded segment points at its raw clip; keep that once.
            if segment.normalization().is_some() {
                if let Some(path) = ctx
                    .workspace
                    .keep_if_present(segment.normalized_clip_path())
                    .await
                {
                    normalized_clips.push(ClipArtifact {
                        order: segment.order(),
                        path,
                        provider: segment.provider(),
                    });
                }
            }
            if let Some(path) = ctx.workspace.keep_if_present(segment.raw_clip_path()).await {
                raw_clips.push(ClipArtifact {
                    order: segment.order(),
                    path,
                    provider: segment.provider(),
                });
            }
        }

        let partial = PartialArtifacts {
            script: leftovers.script,
            raw_clips,
            normalized_clips,
            silent_video: ctx
                .workspace
                .keep_if_present(leftovers.silent_video.as_deref())
                .await,
            audio: ctx
                .workspace
                .keep_if_present(leftovers.audio.as_deref())
                .await,
        };

        metrics::record_run("aborted", ctx.started.elapsed().as_secs_f64());
        self.state_tx.send_replace(PipelineState::Aborted);

        PipelineResult::Aborted(AbortedRun {
            run_id: ctx.run_id.clone(),
            stage,
            error_kind: error.kind().to_string(),
            error: error.to_string(),
            diagnostics: error.diagnostics().map(str::to_string),
            segment_failures: leftovers.segment_failures,
            partial,
            started_at: ctx.started_at,
            finished_at: Utc::now(),
        })
    }
}

async fn join_voiceover(handle: JoinHandle<CollaboratorResult<PathBuf>>) -> RunResult<PathBuf> {
    let result = match handle.await {
        Ok(Ok(path)) => Ok(path),
        Ok(Err(e)) => Err(PipelineError::voiceover_failed(e.to_string())),
        Err(e) => Err(PipelineError::voiceover_failed(format!("speech task failed: {}", e))),
    };
    metrics::record_collaborator("speech", result.is_ok());
    result
}
