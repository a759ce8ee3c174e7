//! Voice HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::application::{GetVoice, ListVoices};
use crate::infrastructure::http::dto::{ApiResponse, GetVoiceRequest, VoiceDto};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 获取音色列表
pub async fn list_voices(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<VoiceDto>>> {
    let voices = state
        .list_voices_handler
        .handle(ListVoices)
        .into_iter()
        .map(VoiceDto::from)
        .collect();

    Json(ApiResponse::success(voices))
}

/// 获取音色详情
pub async fn get_voice(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetVoiceRequest>,
) -> Result<Json<ApiResponse<VoiceDto>>, ApiError> {
    let voice = state
        .get_voice_handler
        .handle(GetVoice { voice_id: req.id })?;

    Ok(Json(ApiResponse::success(voice.into())))
}
