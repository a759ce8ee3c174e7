//! GenerateVideo Handler - 一次完整的视频生成运行
//!
//! 分段 → 并发合成 → 字幕帧 → 时间轴 → 片段渲染 → 分层合并 → 落盘 → 可选上传
//!
//! 每次运行持有独立的 ArtifactLifecycleManager，无论成功、失败还是 future 被丢弃，
//! 临时产物都会被清理。

use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;

use crate::application::commands::{GenerateVideoCommand, RenderFailurePolicy, VideoOutcome};
use crate::application::error::PipelineError;
use crate::application::pipeline::{
    ArtifactLifecycleManager, BatchCompiler, SchedulerConfig, SynthesisScheduler,
    DEFAULT_BATCH_SIZE,
};
use crate::application::ports::{
    AudioProbePort, CaptionRendererPort, ClosingCard, FrameSize, ObjectStoragePort,
    ProgressReporter, RenderError, RenderSegmentRequest, TtsEnginePort, VideoMuxerPort,
};
use crate::domain::narration::{
    ArtifactHandle, ArtifactStage, Segment, SynthesisResult, TimedUnit, UnitKind,
};
use crate::domain::voice::{Voice, VoiceCatalog, VoiceId};
use crate::domain::{
    build_timeline, segment_text, total_duration, SegmentConfig, DEFAULT_CLOSING_DURATION_SECS,
};

const CAPTION_CREATED_BY: &str = "caption_renderer";
const RENDER_CREATED_BY: &str = "segment_renderer";

// 各阶段在总进度中的区间
const SYNTHESIS_SHARE: f32 = 0.6;
const RENDER_START: f32 = 0.6;
const RENDER_SHARE: f32 = 0.25;

/// 运行参数
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub segment: SegmentConfig,
    pub scheduler: SchedulerConfig,
    pub batch_size: usize,
    pub closing_duration: f64,
    pub render_failure_policy: RenderFailurePolicy,
    pub frame_size: FrameSize,
    pub closing_card: ClosingCard,
    /// 每次运行在其下创建独立的临时目录
    pub work_dir: PathBuf,
    /// 最终视频保存在 `<output_dir>/<job_id>/<name>.mp4`
    pub output_dir: PathBuf,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            segment: SegmentConfig::default(),
            scheduler: SchedulerConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            closing_duration: DEFAULT_CLOSING_DURATION_SECS,
            render_failure_policy: RenderFailurePolicy::default(),
            frame_size: FrameSize::default(),
            closing_card: ClosingCard::default(),
            work_dir: std::env::temp_dir().join("textreel"),
            output_dir: PathBuf::from("./data/videos"),
        }
    }
}

/// 字幕帧阶段的产出
struct CaptionedUnits {
    kept: Vec<SynthesisResult>,
    captions: Vec<ArtifactHandle>,
    skipped: Vec<usize>,
}

/// GenerateVideo Handler
pub struct GenerateVideoHandler {
    catalog: Arc<VoiceCatalog>,
    tts_engine: Arc<dyn TtsEnginePort>,
    audio_probe: Arc<dyn AudioProbePort>,
    renderer: Arc<dyn CaptionRendererPort>,
    muxer: Arc<dyn VideoMuxerPort>,
    uploader: Option<Arc<dyn ObjectStoragePort>>,
    settings: PipelineSettings,
}

impl GenerateVideoHandler {
    pub fn new(
        catalog: Arc<VoiceCatalog>,
        tts_engine: Arc<dyn TtsEnginePort>,
        audio_probe: Arc<dyn AudioProbePort>,
        renderer: Arc<dyn CaptionRendererPort>,
        muxer: Arc<dyn VideoMuxerPort>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            catalog,
            tts_engine,
            audio_probe,
            renderer,
            muxer,
            uploader: None,
            settings,
        }
    }

    /// 启用上传
    pub fn with_uploader(mut self, uploader: Arc<dyn ObjectStoragePort>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub async fn handle(
        &self,
        cmd: GenerateVideoCommand,
        progress: &dyn ProgressReporter,
    ) -> Result<VideoOutcome, PipelineError> {
        if cmd.text.trim().is_empty() {
            return Err(PipelineError::invalid_input("text is empty"));
        }
        let voice = VoiceId::new(cmd.voice_id.as_str())
            .and_then(|id| self.catalog.find(&id).cloned())
            .map_err(|e| PipelineError::invalid_input(e.to_string()))?;

        fs::create_dir_all(&self.settings.work_dir)
            .await
            .map_err(|e| PipelineError::Internal(format!("cannot create work dir: {}", e)))?;
        let lifecycle = Arc::new(
            ArtifactLifecycleManager::new(&self.settings.work_dir)
                .map_err(|e| PipelineError::Internal(format!("cannot create run dir: {}", e)))?,
        );

        tracing::info!(
            job_id = %cmd.job_id,
            run_id = %lifecycle.run_id(),
            voice = %voice.id,
            chars = cmd.text.chars().count(),
            "Pipeline started"
        );

        let result = self.run(&cmd, &voice, &lifecycle, progress).await;

        let report = lifecycle.teardown().await;
        tracing::debug!(
            job_id = %cmd.job_id,
            removed = report.removed,
            failed = report.failed,
            "Run artifacts cleaned up"
        );

        match &result {
            Ok(outcome) => tracing::info!(
                job_id = %cmd.job_id,
                output = %outcome.output_path.display(),
                segments = outcome.segment_count,
                skipped = outcome.skipped_segments.len(),
                duration = outcome.duration_seconds,
                "Pipeline completed"
            ),
            Err(e) => tracing::error!(
                job_id = %cmd.job_id,
                stage = e.stage(),
                index = ?e.index(),
                error = %e,
                "Pipeline failed"
            ),
        }

        result
    }

    async fn run(
        &self,
        cmd: &GenerateVideoCommand,
        voice: &Voice,
        lifecycle: &Arc<ArtifactLifecycleManager>,
        progress: &dyn ProgressReporter,
    ) -> Result<VideoOutcome, PipelineError> {
        progress.report(0.0, "segmenting");
        let segments = segment_text(&cmd.text, &self.settings.segment);
        if segments.is_empty() {
            return Err(PipelineError::invalid_input("text produced no segments"));
        }
        tracing::info!(
            segments = segments.len(),
            oversized = segments.iter().filter(|s| s.is_oversized()).count(),
            "Text segmented"
        );

        let scheduler = SynthesisScheduler::new(
            self.tts_engine.clone(),
            self.audio_probe.clone(),
            lifecycle.clone(),
            self.settings.scheduler.clone(),
        );
        let results = scheduler
            .synthesize_all(segments.clone(), voice, |done, total| {
                let fraction = SYNTHESIS_SHARE * done as f32 / (total + 1) as f32;
                progress.report(fraction, &format!("synthesizing {}/{}", done, total));
            })
            .await?;

        let captioned = self.render_captions(&segments, results, lifecycle).await?;
        let timeline = build_timeline(&captioned.kept, self.settings.closing_duration);
        let segment_count = captioned.kept.len();
        let skipped_segments = captioned.skipped.clone();

        let rendered = self
            .render_units(&timeline, captioned, lifecycle, progress)
            .await?;

        progress.report(RENDER_START + RENDER_SHARE, "merging");
        let compiler =
            BatchCompiler::new(self.muxer.clone(), lifecycle.clone(), self.settings.batch_size);
        let merged = compiler.compile(rendered).await?;
        let final_video = lifecycle.promote(&merged, ArtifactStage::Final);

        progress.report(0.95, "persisting");
        let dest = self
            .settings
            .output_dir
            .join(&cmd.job_id)
            .join(format!("{}.mp4", cmd.output_name));
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::Persist(e.to_string()))?;
        }
        let output_path = lifecycle
            .persist(&final_video, &dest)
            .await
            .map_err(|e| PipelineError::Persist(e.to_string()))?;

        let upload = match &self.uploader {
            Some(uploader) => {
                progress.report(0.98, "uploading");
                let key = format!("{}/{}.mp4", cmd.job_id, cmd.output_name);
                let result = uploader.upload(&output_path, &key).await;
                match &result {
                    Ok(url) => tracing::info!(job_id = %cmd.job_id, url = %url, "Video uploaded"),
                    Err(e) => tracing::warn!(job_id = %cmd.job_id, error = %e, "Upload failed"),
                }
                Some(result)
            }
            None => None,
        };

        progress.report(1.0, "completed");

        Ok(VideoOutcome {
            output_path,
            segment_count,
            skipped_segments,
            duration_seconds: total_duration(&timeline),
            timeline,
            upload,
        })
    }

    /// 为每个合成结果渲染字幕帧，按策略处理渲染失败
    async fn render_captions(
        &self,
        segments: &[Segment],
        results: Vec<SynthesisResult>,
        lifecycle: &ArtifactLifecycleManager,
    ) -> Result<CaptionedUnits, PipelineError> {
        let mut units = CaptionedUnits {
            kept: Vec::with_capacity(results.len()),
            captions: Vec::with_capacity(results.len()),
            skipped: Vec::new(),
        };

        for result in results {
            let index = result.index;
            let text = segments
                .get(index)
                .map(|s| s.text().to_string())
                .unwrap_or_default();

            let frame = self
                .rasterize(
                    lifecycle,
                    format!("caption_{:05}.png", index),
                    move |renderer, size| renderer.render_caption(&text, size),
                )
                .await;

            match frame {
                Ok(caption) => {
                    units.kept.push(result);
                    units.captions.push(caption);
                }
                Err(e) => match self.settings.render_failure_policy {
                    RenderFailurePolicy::Abort => {
                        return Err(PipelineError::render(Some(index), e.to_string()));
                    }
                    RenderFailurePolicy::Skip => {
                        tracing::warn!(
                            segment_index = index,
                            error = %e,
                            "Caption render failed, skipping segment"
                        );
                        lifecycle.release(&result.audio).await;
                        units.skipped.push(index);
                    }
                },
            }
        }

        if units.kept.is_empty() {
            return Err(PipelineError::render(
                units.skipped.first().copied(),
                "every narration segment failed to render",
            ));
        }

        Ok(units)
    }

    /// 按时间轴渲染每个单元的片段视频，消费过的音频和字幕帧随即释放
    async fn render_units(
        &self,
        timeline: &[TimedUnit],
        captioned: CaptionedUnits,
        lifecycle: &ArtifactLifecycleManager,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ArtifactHandle>, PipelineError> {
        let unit_count = timeline.len();
        let mut narration = captioned.kept.into_iter().zip(captioned.captions);
        let mut rendered = Vec::with_capacity(unit_count);

        for (position, unit) in timeline.iter().enumerate() {
            progress.report(
                RENDER_START + RENDER_SHARE * position as f32 / unit_count as f32,
                &format!("rendering {}/{}", position + 1, unit_count),
            );

            let output = lifecycle.allocate(
                ArtifactStage::RenderedSegment,
                RENDER_CREATED_BY,
                &format!("segment_{:05}.mp4", unit.segment_index),
            );

            match unit.kind {
                UnitKind::Narration => {
                    let (result, caption) = narration.next().ok_or_else(|| {
                        PipelineError::Internal("timeline and rendered units out of sync".into())
                    })?;

                    let request = RenderSegmentRequest {
                        image: caption.path().to_path_buf(),
                        audio: Some(result.audio.path().to_path_buf()),
                        start_offset: unit.start_offset,
                        duration: unit.duration,
                        output: output.path().to_path_buf(),
                    };
                    self.muxer
                        .render_segment(&request)
                        .await
                        .map_err(|e| PipelineError::render(Some(unit.segment_index), e.to_string()))?;

                    lifecycle.release(&result.audio).await;
                    lifecycle.release(&caption).await;
                }
                UnitKind::Closing => {
                    let card = self.settings.closing_card.clone();
                    let frame = self
                        .rasterize(lifecycle, "closing.png".to_string(), move |renderer, size| {
                            renderer.render_closing(&card, size)
                        })
                        .await
                        .map_err(|e| PipelineError::render(None, e.to_string()))?;

                    let request = RenderSegmentRequest {
                        image: frame.path().to_path_buf(),
                        audio: None,
                        start_offset: unit.start_offset,
                        duration: unit.duration,
                        output: output.path().to_path_buf(),
                    };
                    self.muxer
                        .render_segment(&request)
                        .await
                        .map_err(|e| PipelineError::render(None, e.to_string()))?;

                    lifecycle.release(&frame).await;
                }
            }

            tracing::debug!(
                segment_index = unit.segment_index,
                kind = ?unit.kind,
                start = unit.start_offset,
                duration = unit.duration,
                "Unit rendered"
            );
            rendered.push(output);
        }

        Ok(rendered)
    }

    /// 在阻塞线程池中光栅化一帧并编码为 PNG，登记为字幕帧产物
    async fn rasterize<F>(
        &self,
        lifecycle: &ArtifactLifecycleManager,
        file_name: String,
        draw: F,
    ) -> Result<ArtifactHandle, RenderError>
    where
        F: FnOnce(&dyn CaptionRendererPort, FrameSize) -> Option<RgbImage> + Send + 'static,
    {
        let renderer = self.renderer.clone();
        let size = self.settings.frame_size;

        let png = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, RenderError> {
            let frame = draw(renderer.as_ref(), size).ok_or(RenderError::NoImage)?;
            let mut buf = Cursor::new(Vec::new());
            frame
                .write_to(&mut buf, ImageFormat::Png)
                .map_err(|e| RenderError::Encode(e.to_string()))?;
            Ok(buf.into_inner())
        })
        .await
        .map_err(|e| RenderError::Task(e.to_string()))??;

        lifecycle
            .write(ArtifactStage::CaptionImage, CAPTION_CREATED_BY, &file_name, &png)
            .await
            .map_err(|e| RenderError::Encode(e.to_string()))
    }
}
