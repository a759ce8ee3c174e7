//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                     GET   健康检查
//! - /api/voice/list               GET   列出所有音色
//! - /api/voice/get                POST  获取音色详情
//! - /api/video/create             POST  提交文本（multipart 或 JSON），创建视频任务
//! - /api/video/status             POST  查询任务状态
//! - /api/video/download/{job_id}  GET   下载完成的视频

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/voice", voice_routes())
        .nest("/video", video_routes())
}

/// Voice 路由
fn voice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", get(handlers::list_voices))
        .route("/get", post(handlers::get_voice))
}

/// Video 路由
fn video_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_video))
        .route("/status", post(handlers::video_status))
        .route("/download/:job_id", get(handlers::download_video))
}
