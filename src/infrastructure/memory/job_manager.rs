//! In-Memory Job Manager Implementation

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::application::ports::{
    JobError, JobFailure, JobManagerPort, JobOutput, JobState, VideoJob,
};

/// 已结束任务的保留策略
#[derive(Debug, Clone, Copy)]
pub struct JobRetention {
    /// 结束后保留的时长
    pub ttl: Duration,
    /// 最多保留的已结束任务数
    pub max_finished: usize,
}

impl Default for JobRetention {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_finished: 256,
        }
    }
}

/// 内存任务管理器
pub struct InMemoryJobManager {
    /// job_id -> VideoJob
    jobs: DashMap<String, VideoJob>,
    /// 任务队列发送端
    queue_sender: mpsc::Sender<String>,
    retention: JobRetention,
}

impl InMemoryJobManager {
    pub fn new(queue_sender: mpsc::Sender<String>) -> Self {
        Self {
            jobs: DashMap::new(),
            queue_sender,
            retention: JobRetention::default(),
        }
    }

    pub fn with_retention(mut self, retention: JobRetention) -> Self {
        self.retention = retention;
        self
    }

    /// 淘汰过期或超出数量上限的已结束任务，返回淘汰数量
    ///
    /// 排队中和生成中的任务不受影响
    pub fn evict_finished(&self) -> usize {
        let cutoff = chrono::Duration::from_std(self.retention.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl));

        let mut finished: Vec<(String, DateTime<Utc>)> = self
            .jobs
            .iter()
            .filter(|job| job.state.is_terminal())
            .filter_map(|job| job.completed_at.map(|at| (job.job_id.clone(), at)))
            .collect();
        // 最早结束的排在前面
        finished.sort_by_key(|(_, completed_at)| *completed_at);

        let over_cap = finished.len().saturating_sub(self.retention.max_finished);
        let mut evicted = 0;
        for (position, (job_id, completed_at)) in finished.iter().enumerate() {
            let expired = cutoff.map_or(false, |cutoff| *completed_at <= cutoff);
            if (position < over_cap || expired) && self.jobs.remove(job_id).is_some() {
                evicted += 1;
            }
        }

        if evicted > 0 {
            tracing::debug!(
                evicted = evicted,
                remaining = self.jobs.len(),
                "Finished jobs evicted"
            );
        }
        evicted
    }
}

impl JobManagerPort for InMemoryJobManager {
    fn submit(&self, job: VideoJob) -> Result<String, JobError> {
        let job_id = job.job_id.clone();
        if self.jobs.contains_key(&job_id) {
            return Err(JobError::AlreadyExists(job_id));
        }

        self.evict_finished();
        self.jobs.insert(job_id.clone(), job);

        // 发送到队列，队列满或已关闭时撤回任务
        if let Err(e) = self.queue_sender.try_send(job_id.clone()) {
            self.jobs.remove(&job_id);
            tracing::warn!(job_id = %job_id, error = %e, "Failed to enqueue job");
            return Err(JobError::QueueUnavailable(e.to_string()));
        }

        tracing::debug!(job_id = %job_id, "Job submitted");
        Ok(job_id)
    }

    fn get(&self, job_id: &str) -> Option<VideoJob> {
        self.jobs.get(job_id).map(|j| j.clone())
    }

    fn set_running(&self, job_id: &str) -> Result<(), JobError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        job.state = JobState::Running;
        job.stage = "starting".to_string();

        tracing::debug!(job_id = %job_id, "Job running");
        Ok(())
    }

    fn update_progress(&self, job_id: &str, progress: f32, stage: &str) {
        if let Some(mut job) = self.jobs.get_mut(job_id) {
            if job.state.is_terminal() {
                return;
            }
            job.progress = progress.clamp(0.0, 1.0);
            job.stage = stage.to_string();
        }
    }

    fn complete(&self, job_id: &str, output: JobOutput) -> Result<(), JobError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        job.state = JobState::Completed;
        job.progress = 1.0;
        job.stage = "completed".to_string();
        job.output = Some(output);
        job.completed_at = Some(Utc::now());
        // 输入文本只在生成时需要
        job.text = String::new();
        drop(job);

        self.evict_finished();
        Ok(())
    }

    fn fail(&self, job_id: &str, failure: JobFailure) -> Result<(), JobError> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        job.state = JobState::Failed;
        job.stage = format!("failed: {}", failure.stage);
        job.failure = Some(failure);
        job.completed_at = Some(Utc::now());
        job.text = String::new();
        drop(job);

        self.evict_finished();
        Ok(())
    }

    fn list(&self) -> Vec<VideoJob> {
        let mut jobs: Vec<VideoJob> = self.jobs.iter().map(|j| j.clone()).collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }
}
