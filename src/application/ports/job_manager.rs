//! Job Manager Port - 视频生成任务管理
//!
//! 定义任务管理的抽象接口，具体实现在 infrastructure/memory 层

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Job Manager 错误
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already exists: {0}")]
    AlreadyExists(String),

    #[error("Job queue unavailable: {0}")]
    QueueUnavailable(String),
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// 排队中
    Pending,
    /// 生成中
    Running,
    /// 生成完成
    Completed,
    /// 生成失败
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// 失败信息：哪个阶段、哪个片段/批次、原因
#[derive(Debug, Clone, Serialize)]
pub struct JobFailure {
    pub stage: String,
    pub index: Option<usize>,
    pub message: String,
}

/// 成功产出
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    pub output_path: PathBuf,
    pub segment_count: usize,
    pub skipped_segments: Vec<usize>,
    pub duration_seconds: f64,
    pub upload_url: Option<String>,
    pub upload_error: Option<String>,
}

/// 视频生成任务
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub job_id: String,
    pub output_name: String,
    pub voice_id: String,
    pub text: String,
    pub state: JobState,
    pub progress: f32,
    pub stage: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub output: Option<JobOutput>,
    pub failure: Option<JobFailure>,
}

impl VideoJob {
    pub fn new(text: String, voice_id: String, output_name: String) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            output_name,
            voice_id,
            text,
            state: JobState::Pending,
            progress: 0.0,
            stage: "queued".to_string(),
            created_at: Utc::now(),
            completed_at: None,
            output: None,
            failure: None,
        }
    }
}

/// Job Manager Port
///
/// 管理视频任务的生命周期，所有状态存储在内存中
pub trait JobManagerPort: Send + Sync {
    /// 提交任务到队列
    fn submit(&self, job: VideoJob) -> Result<String, JobError>;

    /// 获取任务
    fn get(&self, job_id: &str) -> Option<VideoJob>;

    /// 标记为生成中
    fn set_running(&self, job_id: &str) -> Result<(), JobError>;

    /// 更新进度
    fn update_progress(&self, job_id: &str, progress: f32, stage: &str);

    /// 标记完成
    fn complete(&self, job_id: &str, output: JobOutput) -> Result<(), JobError>;

    /// 标记失败
    fn fail(&self, job_id: &str, failure: JobFailure) -> Result<(), JobError>;

    /// 列出所有任务
    fn list(&self) -> Vec<VideoJob>;
}
