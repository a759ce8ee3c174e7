//! Synthesis Scheduler - 有界并发的语音合成调度
//!
//! - 固定大小的并发池（Semaphore）调用外部 TTS
//! - 限流错误按 base * 2^attempt 退避重试，最多 max_retries 次；其他错误立即失败
//! - 完成顺序任意，全部完成后按 index 重新排序再交给下游
//! - 任一片段终止失败：不再派发新片段，在途调用完成后丢弃结果，
//!   已产出的音频全部释放，返回一个指明最小失败 index 的错误

use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AudioFormat, AudioProbePort, ProbeError, SynthesisRequest, SynthesizedAudio, TtsEnginePort,
    TtsError,
};
use crate::domain::narration::{ArtifactStage, Segment, SynthesisResult};
use crate::domain::voice::Voice;

use super::artifact_lifecycle::ArtifactLifecycleManager;

const CREATED_BY: &str = "synthesis_scheduler";

/// 默认并发数
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 4;

/// 重试策略
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 限流时最多重试次数（总调用次数 = max_retries + 1）
    pub max_retries: u32,
    /// 退避基数
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// 第 attempt 次（从 0 开始）调用失败后的等待时间：base * 2^attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base
            .checked_mul(1u32 << attempt.min(16))
            .unwrap_or(Duration::MAX)
    }
}

/// 单个片段的重试状态，只存在于一次合成调用内
#[derive(Debug, Clone, Copy)]
struct RetryState {
    attempt: u32,
    next_backoff: Duration,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            next_backoff: policy.backoff_for(0),
        }
    }

    fn advance(&mut self, policy: &RetryPolicy) {
        self.attempt += 1;
        self.next_backoff = policy.backoff_for(self.attempt);
    }
}

/// 调度配置
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub concurrency_limit: usize,
    pub retry: RetryPolicy,
    pub audio_format: AudioFormat,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            retry: RetryPolicy::default(),
            audio_format: AudioFormat::Mp3,
        }
    }
}

/// 片段终止失败的原因
#[derive(Debug, Error)]
pub enum SynthesisCause {
    /// 非限流错误，不重试
    #[error("{0}")]
    Fatal(TtsError),

    /// 限流重试次数用尽
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: TtsError },

    #[error("failed to store audio: {0}")]
    Storage(String),

    #[error("failed to measure audio duration: {0}")]
    Probe(ProbeError),

    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

/// 调度失败（聚合）
#[derive(Debug, Error)]
#[error("synthesis failed at segment {segment_index}: {cause}")]
pub struct SynthesisFailure {
    /// 最小的失败片段 index
    pub segment_index: usize,
    /// 失败前已完成（随后被丢弃）的片段数
    pub completed: usize,
    /// 片段总数
    pub total: usize,
    pub cause: SynthesisCause,
}

/// 单个 worker 的结局
enum SegmentOutcome {
    Done(SynthesisResult),
    Cancelled,
    Failed(SynthesisCause),
}

/// worker 共享的上下文
struct WorkerContext {
    tts_engine: Arc<dyn TtsEnginePort>,
    audio_probe: Arc<dyn AudioProbePort>,
    lifecycle: Arc<ArtifactLifecycleManager>,
    voice: Voice,
    config: SchedulerConfig,
}

/// 语音合成调度器
pub struct SynthesisScheduler {
    tts_engine: Arc<dyn TtsEnginePort>,
    audio_probe: Arc<dyn AudioProbePort>,
    lifecycle: Arc<ArtifactLifecycleManager>,
    config: SchedulerConfig,
}

impl SynthesisScheduler {
    pub fn new(
        tts_engine: Arc<dyn TtsEnginePort>,
        audio_probe: Arc<dyn AudioProbePort>,
        lifecycle: Arc<ArtifactLifecycleManager>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            tts_engine,
            audio_probe,
            lifecycle,
            config,
        }
    }

    /// 合成所有片段
    ///
    /// 成功时返回的结果与输入片段一一对应，按 index 升序。
    /// `on_progress(done, total)` 在每个片段完成时调用。
    pub async fn synthesize_all<P>(
        &self,
        segments: Vec<Segment>,
        voice: &Voice,
        on_progress: P,
    ) -> Result<Vec<SynthesisResult>, SynthesisFailure>
    where
        P: Fn(usize, usize),
    {
        let total = segments.len();
        let concurrency = self.config.concurrency_limit.max(1);

        tracing::info!(
            segments = total,
            concurrency = concurrency,
            voice = %voice.id,
            "Synthesis started"
        );

        let context = Arc::new(WorkerContext {
            tts_engine: self.tts_engine.clone(),
            audio_probe: self.audio_probe.clone(),
            lifecycle: self.lifecycle.clone(),
            voice: voice.clone(),
            config: self.config.clone(),
        });
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let cancel = CancellationToken::new();
        // 调度 future 被丢弃时，排队中的片段不再开始
        let _cancel_on_drop = cancel.clone().drop_guard();

        let mut pending = FuturesUnordered::new();
        for segment in segments {
            let index = segment.index();
            let handle = tokio::spawn(run_worker(
                context.clone(),
                semaphore.clone(),
                cancel.clone(),
                segment,
            ));
            pending.push(handle.map(move |joined| (index, joined)));
        }

        let mut completed: Vec<SynthesisResult> = Vec::with_capacity(total);
        let mut failures: Vec<(usize, SynthesisCause)> = Vec::new();

        while let Some((index, joined)) = pending.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                SegmentOutcome::Failed(SynthesisCause::WorkerPanicked(e.to_string()))
            });

            match outcome {
                SegmentOutcome::Done(result) => {
                    completed.push(result);
                    if failures.is_empty() {
                        on_progress(completed.len(), total);
                    }
                }
                SegmentOutcome::Cancelled => {
                    tracing::debug!(segment_index = index, "Segment not dispatched, run aborted");
                }
                SegmentOutcome::Failed(cause) => {
                    tracing::error!(
                        segment_index = index,
                        error = %cause,
                        "Segment synthesis failed, aborting remaining work"
                    );
                    cancel.cancel();
                    failures.push((index, cause));
                }
            }
        }

        if let Some((segment_index, cause)) = failures.into_iter().min_by_key(|(i, _)| *i) {
            let discarded = completed.len();
            for result in &completed {
                self.lifecycle.release(&result.audio).await;
            }
            return Err(SynthesisFailure {
                segment_index,
                completed: discarded,
                total,
                cause,
            });
        }

        completed.sort_by_key(|r| r.index);

        tracing::info!(
            segments = completed.len(),
            total_duration = completed.iter().map(|r| r.duration).sum::<f64>(),
            "Synthesis completed"
        );
        Ok(completed)
    }
}

/// 单个片段：等待并发名额 → 合成（含重试）→ 落盘 → 测量时长
async fn run_worker(
    context: Arc<WorkerContext>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    segment: Segment,
) -> SegmentOutcome {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return SegmentOutcome::Cancelled,
    };

    if cancel.is_cancelled() {
        return SegmentOutcome::Cancelled;
    }

    let outcome = process_segment(&context, &cancel, segment).await;
    // 必须在归还并发名额之前取消，排队中的片段才不会被派发
    if matches!(outcome, SegmentOutcome::Failed(_)) {
        cancel.cancel();
    }
    outcome
}

async fn process_segment(
    context: &WorkerContext,
    cancel: &CancellationToken,
    segment: Segment,
) -> SegmentOutcome {
    let index = segment.index();
    let request = SynthesisRequest {
        text: segment.text().to_string(),
        voice: context.voice.clone(),
        format: context.config.audio_format,
    };

    let audio = match synthesize_with_retry(context, request, index, cancel).await {
        Ok(Some(audio)) => audio,
        Ok(None) => return SegmentOutcome::Cancelled,
        Err(cause) => return SegmentOutcome::Failed(cause),
    };

    match store_audio(context, index, audio).await {
        Ok(result) => {
            tracing::debug!(
                segment_index = index,
                duration = result.duration,
                "Segment synthesized"
            );
            SegmentOutcome::Done(result)
        }
        Err(cause) => SegmentOutcome::Failed(cause),
    }
}

/// 调用 TTS，限流时退避重试
///
/// 返回 Ok(None) 表示在退避等待期间整个运行已被取消
async fn synthesize_with_retry(
    context: &WorkerContext,
    request: SynthesisRequest,
    index: usize,
    cancel: &CancellationToken,
) -> Result<Option<SynthesizedAudio>, SynthesisCause> {
    let policy = &context.config.retry;
    let mut state = RetryState::new(policy);

    loop {
        match context.tts_engine.synthesize(request.clone()).await {
            Ok(audio) => return Ok(Some(audio)),
            Err(e) if e.is_rate_limited() => {
                if state.attempt >= policy.max_retries {
                    return Err(SynthesisCause::RetriesExhausted {
                        attempts: state.attempt + 1,
                        last: e,
                    });
                }

                let delay = match &e {
                    TtsError::RateLimited {
                        retry_after: Some(hint),
                        ..
                    } => (*hint).max(state.next_backoff),
                    _ => state.next_backoff,
                };

                tracing::warn!(
                    segment_index = index,
                    attempt = state.attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Rate limited, backing off"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Ok(None),
                    _ = tokio::time::sleep(delay) => {}
                }
                state.advance(policy);
            }
            Err(e) => return Err(SynthesisCause::Fatal(e)),
        }
    }
}

/// 音频落盘并取得时长
async fn store_audio(
    context: &WorkerContext,
    index: usize,
    audio: SynthesizedAudio,
) -> Result<SynthesisResult, SynthesisCause> {
    let file_name = format!("audio_{:05}.{}", index, audio.format.extension());
    let handle = context
        .lifecycle
        .write(ArtifactStage::Audio, CREATED_BY, &file_name, &audio.audio_data)
        .await
        .map_err(|e| SynthesisCause::Storage(e.to_string()))?;

    let duration = match audio.duration_secs {
        Some(duration) => duration,
        None => {
            let probe = context.audio_probe.clone();
            let format = audio.format;
            let data = audio.audio_data;
            let measured = tokio::task::spawn_blocking(move || probe.probe(&data, format))
                .await
                .map_err(|e| SynthesisCause::WorkerPanicked(e.to_string()))
                .and_then(|r| r.map_err(SynthesisCause::Probe));

            match measured {
                Ok(info) => info.duration_secs,
                Err(cause) => {
                    context.lifecycle.release(&handle).await;
                    return Err(cause);
                }
            }
        }
    };

    Ok(SynthesisResult {
        index,
        audio: handle,
        duration,
    })
}
