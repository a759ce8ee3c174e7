//! Ping Handler

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::infrastructure::http::state::AppState;

/// Ping 响应
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// 当前排队和运行中的任务数
    pub active_jobs: usize,
}

/// Ping endpoint - 健康检查
pub async fn ping(State(state): State<Arc<AppState>>) -> Json<PingResponse> {
    let active_jobs = state
        .job_manager
        .list()
        .iter()
        .filter(|job| !job.state.is_terminal())
        .count();

    Json(PingResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_jobs,
    })
}
