//! Video Worker - Background Video Job Processor

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::application::commands::handlers::GenerateVideoHandler;
use crate::application::commands::{GenerateVideoCommand, VideoOutcome};
use crate::application::ports::{JobFailure, JobManagerPort, JobOutput, ProgressReporter};

/// Worker 配置
#[derive(Debug, Clone)]
pub struct VideoWorkerConfig {
    /// 同时运行的视频任务数
    pub max_concurrent_jobs: usize,
}

impl Default for VideoWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
        }
    }
}

/// 把流水线进度写入任务状态
pub struct JobProgress {
    job_id: String,
    job_manager: Arc<dyn JobManagerPort>,
}

impl JobProgress {
    pub fn new(job_id: impl Into<String>, job_manager: Arc<dyn JobManagerPort>) -> Self {
        Self {
            job_id: job_id.into(),
            job_manager,
        }
    }
}

impl ProgressReporter for JobProgress {
    fn report(&self, fraction: f32, stage: &str) {
        tracing::debug!(job_id = %self.job_id, progress = fraction, stage = %stage, "Job progress");
        self.job_manager.update_progress(&self.job_id, fraction, stage);
    }
}

/// 视频 Worker
///
/// 后台任务处理器，从队列消费任务并执行视频生成
pub struct VideoWorker {
    config: VideoWorkerConfig,
    queue_receiver: mpsc::Receiver<String>,
    job_manager: Arc<dyn JobManagerPort>,
    handler: Arc<GenerateVideoHandler>,
}

impl VideoWorker {
    pub fn new(
        config: VideoWorkerConfig,
        queue_receiver: mpsc::Receiver<String>,
        job_manager: Arc<dyn JobManagerPort>,
        handler: Arc<GenerateVideoHandler>,
    ) -> Self {
        Self {
            config,
            queue_receiver,
            job_manager,
            handler,
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "VideoWorker started"
        );

        // 使用 semaphore 控制并发
        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            self.config.max_concurrent_jobs.max(1),
        ));

        while let Some(job_id) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to acquire semaphore permit");
                    break;
                }
            };

            let job_manager = self.job_manager.clone();
            let handler = self.handler.clone();

            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到任务完成
                Self::process_job(job_id, job_manager, handler).await;
            });
        }

        tracing::info!("VideoWorker stopped");
    }

    /// 处理单个任务
    async fn process_job(
        job_id: String,
        job_manager: Arc<dyn JobManagerPort>,
        handler: Arc<GenerateVideoHandler>,
    ) {
        let job = match job_manager.get(&job_id) {
            Some(job) => job,
            None => {
                tracing::warn!(job_id = %job_id, "Job not found, skipping");
                return;
            }
        };

        if let Err(e) = job_manager.set_running(&job_id) {
            tracing::error!(job_id = %job_id, error = %e, "Failed to update job state");
            return;
        }

        let cmd = GenerateVideoCommand {
            job_id: job.job_id.clone(),
            text: job.text,
            voice_id: job.voice_id,
            output_name: job.output_name,
        };

        // 流水线在独立任务中运行，panic 时任务仍能被标记为失败
        let run = {
            let job_manager = job_manager.clone();
            let job_id = job_id.clone();
            tokio::spawn(async move {
                let progress = JobProgress::new(job_id, job_manager);
                handler.handle(cmd, &progress).await
            })
        };

        let result = match run.await {
            Ok(result) => result.map_err(|e| JobFailure {
                stage: e.stage().to_string(),
                index: e.index(),
                message: e.to_string(),
            }),
            Err(e) => Err(JobFailure {
                stage: "internal".to_string(),
                index: None,
                message: format!("pipeline task aborted: {}", e),
            }),
        };

        let recorded = match result {
            Ok(outcome) => {
                tracing::info!(
                    job_id = %job_id,
                    output = %outcome.output_path.display(),
                    "Job completed"
                );
                job_manager.complete(&job_id, job_output(outcome))
            }
            Err(failure) => {
                tracing::error!(
                    job_id = %job_id,
                    stage = %failure.stage,
                    index = ?failure.index,
                    error = %failure.message,
                    "Job failed"
                );
                job_manager.fail(&job_id, failure)
            }
        };

        if let Err(e) = recorded {
            tracing::error!(job_id = %job_id, error = %e, "Failed to record job result");
        }
    }
}

fn job_output(outcome: VideoOutcome) -> JobOutput {
    let (upload_url, upload_error) = match outcome.upload {
        Some(Ok(url)) => (Some(url), None),
        Some(Err(e)) => (None, Some(e.to_string())),
        None => (None, None),
    };

    JobOutput {
        output_path: outcome.output_path,
        segment_count: outcome.segment_count,
        skipped_segments: outcome.skipped_segments,
        duration_seconds: outcome.duration_seconds,
        upload_url,
        upload_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{UploadError, VideoJob};
    use crate::infrastructure::memory::InMemoryJobManager;
    use std::path::PathBuf;

    #[test]
    fn test_job_output_separates_upload_error() {
        let outcome = VideoOutcome {
            output_path: PathBuf::from("/data/videos/j/v.mp4"),
            segment_count: 3,
            skipped_segments: vec![],
            duration_seconds: 12.0,
            timeline: vec![],
            upload: Some(Err(UploadError::Rejected {
                status: 403,
                message: "denied".into(),
            })),
        };

        let output = job_output(outcome);
        assert!(output.upload_url.is_none());
        assert_eq!(
            output.upload_error.as_deref(),
            Some("Upload rejected with HTTP 403: denied")
        );
        assert_eq!(output.segment_count, 3);
    }

    #[tokio::test]
    async fn test_job_progress_updates_manager() {
        let (tx, _rx) = mpsc::channel(4);
        let manager = Arc::new(InMemoryJobManager::new(tx));
        let job_id = manager
            .submit(VideoJob::new(
                "Hola.".into(),
                "es-ES-Neural2-A".into(),
                "video_generado".into(),
            ))
            .unwrap();
        manager.set_running(&job_id).unwrap();

        let progress = JobProgress::new(job_id.clone(), manager.clone());
        progress.report(0.3, "synthesizing 1/3");

        let job = manager.get(&job_id).unwrap();
        assert_eq!(job.progress, 0.3);
        assert_eq!(job.stage, "synthesizing 1/3");
    }
}
