//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::{JobFailure, JobState, JobStatusResponse, VoiceResponse};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

// ============================================================================
// Voice DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GetVoiceRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct VoiceDto {
    pub id: String,
    pub gender: String,
    pub language_code: String,
}

impl From<VoiceResponse> for VoiceDto {
    fn from(v: VoiceResponse) -> Self {
        Self {
            id: v.id,
            gender: v.gender,
            language_code: v.language_code,
        }
    }
}

// ============================================================================
// Video DTOs
// ============================================================================

/// JSON 形式的创建请求；multipart 形式使用同名字段，文本放在 `file`
#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateVideoResponse {
    pub job_id: String,
    pub status: JobState,
}

#[derive(Debug, Deserialize)]
pub struct VideoStatusRequest {
    pub job_id: String,
}

#[derive(Debug, Serialize)]
pub struct VideoStatusResponse {
    pub job_id: String,
    pub status: JobState,
    pub progress: f32,
    pub stage: String,
    pub output_name: String,
    pub segment_count: Option<usize>,
    pub skipped_segments: Vec<usize>,
    pub duration_seconds: Option<f64>,
    /// 完成后可用的下载地址
    pub download_url: Option<String>,
    pub upload_url: Option<String>,
    pub upload_error: Option<String>,
    pub error: Option<JobFailure>,
}

impl From<JobStatusResponse> for VideoStatusResponse {
    fn from(r: JobStatusResponse) -> Self {
        let download_url = (r.state == JobState::Completed)
            .then(|| format!("/api/video/download/{}", r.job_id));
        Self {
            job_id: r.job_id,
            status: r.state,
            progress: r.progress,
            stage: r.stage,
            output_name: r.output_name,
            segment_count: r.segment_count,
            skipped_segments: r.skipped_segments,
            duration_seconds: r.duration_seconds,
            download_url,
            upload_url: r.upload_url,
            upload_error: r.upload_error,
            error: r.failure,
        }
    }
}
