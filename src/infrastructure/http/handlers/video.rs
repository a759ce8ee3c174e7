//! Video HTTP Handlers
//!
//! 创建任务后立即返回 job_id，生成过程由 VideoWorker 在后台执行，
//! 客户端轮询 /api/video/status，完成后通过 /api/video/download 下载。

use axum::{
    body::Body,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::application::{GetJobOutput, GetJobStatus, SubmitVideoCommand};
use crate::infrastructure::http::dto::{
    ApiResponse, CreateVideoRequest, CreateVideoResponse, VideoStatusRequest, VideoStatusResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("multipart/form-data"))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 读取 multipart 表单：`file`（.txt 文本文件）或 `text`，以及可选的 `voice`、`name`
async fn read_multipart(mut multipart: Multipart) -> Result<CreateVideoRequest, ApiError> {
    let mut text: Option<String> = None;
    let mut voice: Option<String> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                let ext = field
                    .file_name()
                    .and_then(|f| FsPath::new(f).extension())
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase());
                if matches!(ext.as_deref(), Some(e) if e != "txt") {
                    return Err(ApiError::BadRequest(
                        "Only .txt files are allowed".to_string(),
                    ));
                }

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                let content = String::from_utf8(bytes.to_vec())
                    .map_err(|_| ApiError::BadRequest("File must be UTF-8 text".to_string()))?;
                text = Some(content);
            }
            "text" => {
                text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read text: {}", e)))?,
                );
            }
            "voice" => {
                voice = field
                    .text()
                    .await
                    .map(non_empty)
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read voice: {}", e)))?;
            }
            "name" => {
                name = field
                    .text()
                    .await
                    .map(non_empty)
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read name: {}", e)))?;
            }
            _ => {}
        }
    }

    let text = text.ok_or_else(|| ApiError::BadRequest("A text file is required".to_string()))?;
    Ok(CreateVideoRequest { text, voice, name })
}

/// 创建视频任务（multipart 或 JSON）
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<ApiResponse<CreateVideoResponse>>, ApiError> {
    let req = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        read_multipart(multipart).await?
    } else {
        let Json(req) = Json::<CreateVideoRequest>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        req
    };

    let result = state.submit_video_handler.handle(SubmitVideoCommand {
        text: req.text,
        voice_id: req.voice,
        output_name: req.name,
    })?;

    tracing::info!(job_id = %result.job_id, "Video job created");

    Ok(Json(ApiResponse::success(CreateVideoResponse {
        job_id: result.job_id,
        status: result.state,
    })))
}

/// 查询任务状态
pub async fn video_status(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VideoStatusRequest>,
) -> Result<Json<ApiResponse<VideoStatusResponse>>, ApiError> {
    let status = state
        .get_job_status_handler
        .handle(GetJobStatus { job_id: req.job_id })?;

    Ok(Json(ApiResponse::success(status.into())))
}

/// 下载已完成的视频（流式返回）
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let output = state
        .get_job_output_handler
        .handle(GetJobOutput {
            job_id: job_id.clone(),
        })?;

    let file = tokio::fs::File::open(&output.path).await.map_err(|e| {
        ApiError::NotFound(format!("Video file for job {} is unavailable: {}", job_id, e))
    })?;

    let file_size = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to get file metadata: {}", e)))?
        .len();

    tracing::info!(
        job_id = %job_id,
        path = %output.path.display(),
        size = file_size,
        "Streaming video download"
    );

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, file_size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", output.file_name),
        )
        .body(body)
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}
