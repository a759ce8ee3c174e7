//! Application State
//!
//! HTTP 层共享的 Command/Query Handlers

use std::sync::Arc;

use crate::application::{
    // Command handlers
    SubmitVideoHandler,
    // Query handlers
    GetJobOutputHandler, GetJobStatusHandler, GetVoiceHandler, ListVoicesHandler,
    // Ports
    JobManagerPort,
};
use crate::domain::voice::VoiceCatalog;

/// 应用状态
///
/// 视频生成本身在 VideoWorker 中执行，HTTP 层只负责提交和查询
pub struct AppState {
    // ========== Ports ==========
    pub job_manager: Arc<dyn JobManagerPort>,
    pub catalog: Arc<VoiceCatalog>,

    // ========== Command Handlers ==========
    pub submit_video_handler: SubmitVideoHandler,

    // ========== Query Handlers ==========
    pub get_job_status_handler: GetJobStatusHandler,
    pub get_job_output_handler: GetJobOutputHandler,
    pub get_voice_handler: GetVoiceHandler,
    pub list_voices_handler: ListVoicesHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(catalog: Arc<VoiceCatalog>, job_manager: Arc<dyn JobManagerPort>) -> Self {
        Self {
            job_manager: job_manager.clone(),
            catalog: catalog.clone(),

            submit_video_handler: SubmitVideoHandler::new(catalog.clone(), job_manager.clone()),

            get_job_status_handler: GetJobStatusHandler::new(job_manager.clone()),
            get_job_output_handler: GetJobOutputHandler::new(job_manager),
            get_voice_handler: GetVoiceHandler::new(catalog.clone()),
            list_voices_handler: ListVoicesHandler::new(catalog),
        }
    }
}
