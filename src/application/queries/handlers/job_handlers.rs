//! Job Query Handlers

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{JobFailure, JobManagerPort, JobState};
use crate::application::queries::{GetJobOutput, GetJobStatus};

/// 任务状态响应
#[derive(Debug, Clone)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub state: JobState,
    pub progress: f32,
    pub stage: String,
    pub output_name: String,
    pub segment_count: Option<usize>,
    pub skipped_segments: Vec<usize>,
    pub duration_seconds: Option<f64>,
    pub upload_url: Option<String>,
    pub upload_error: Option<String>,
    pub failure: Option<JobFailure>,
}

/// GetJobStatus Handler
pub struct GetJobStatusHandler {
    job_manager: Arc<dyn JobManagerPort>,
}

impl GetJobStatusHandler {
    pub fn new(job_manager: Arc<dyn JobManagerPort>) -> Self {
        Self { job_manager }
    }

    pub fn handle(&self, query: GetJobStatus) -> Result<JobStatusResponse, ApplicationError> {
        let job = self
            .job_manager
            .get(&query.job_id)
            .ok_or_else(|| ApplicationError::not_found("Job", query.job_id.as_str()))?;

        let output = job.output.as_ref();
        Ok(JobStatusResponse {
            job_id: job.job_id.clone(),
            state: job.state,
            progress: job.progress,
            stage: job.stage.clone(),
            output_name: job.output_name.clone(),
            segment_count: output.map(|o| o.segment_count),
            skipped_segments: output.map(|o| o.skipped_segments.clone()).unwrap_or_default(),
            duration_seconds: output.map(|o| o.duration_seconds),
            upload_url: output.and_then(|o| o.upload_url.clone()),
            upload_error: output.and_then(|o| o.upload_error.clone()),
            failure: job.failure.clone(),
        })
    }
}

/// 已完成任务的输出文件
#[derive(Debug, Clone)]
pub struct JobOutputFile {
    pub path: PathBuf,
    /// 下载时的文件名，如 `video_generado.mp4`
    pub file_name: String,
}

/// GetJobOutput Handler
pub struct GetJobOutputHandler {
    job_manager: Arc<dyn JobManagerPort>,
}

impl GetJobOutputHandler {
    pub fn new(job_manager: Arc<dyn JobManagerPort>) -> Self {
        Self { job_manager }
    }

    pub fn handle(&self, query: GetJobOutput) -> Result<JobOutputFile, ApplicationError> {
        let job = self
            .job_manager
            .get(&query.job_id)
            .ok_or_else(|| ApplicationError::not_found("Job", query.job_id.as_str()))?;

        match (job.state, job.output) {
            (JobState::Completed, Some(output)) => Ok(JobOutputFile {
                path: output.output_path,
                file_name: format!("{}.mp4", job.output_name),
            }),
            (state, _) => Err(ApplicationError::invalid_state(format!(
                "Job {} is {}, no video available",
                job.job_id,
                state.as_str()
            ))),
        }
    }
}
