//! SubmitVideo Handler - 校验输入并把任务放入队列

use std::sync::Arc;

use crate::application::commands::{sanitize_output_name, SubmitVideoCommand, SubmitVideoResponse};
use crate::application::error::ApplicationError;
use crate::application::ports::{JobManagerPort, VideoJob};
use crate::domain::voice::{VoiceCatalog, VoiceId};

/// 单次提交的最大文本长度（字符）
pub const MAX_TEXT_CHARS: usize = 500_000;

pub struct SubmitVideoHandler {
    catalog: Arc<VoiceCatalog>,
    job_manager: Arc<dyn JobManagerPort>,
}

impl SubmitVideoHandler {
    pub fn new(catalog: Arc<VoiceCatalog>, job_manager: Arc<dyn JobManagerPort>) -> Self {
        Self {
            catalog,
            job_manager,
        }
    }

    pub fn handle(&self, cmd: SubmitVideoCommand) -> Result<SubmitVideoResponse, ApplicationError> {
        if cmd.text.trim().is_empty() {
            return Err(ApplicationError::validation("Text must not be empty"));
        }
        if cmd.text.chars().count() > MAX_TEXT_CHARS {
            return Err(ApplicationError::validation(format!(
                "Text exceeds {} characters",
                MAX_TEXT_CHARS
            )));
        }

        // 未知音色在排队前拒绝
        let voice = match cmd.voice_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => self.catalog.find(&VoiceId::new(id)?)?,
            _ => self
                .catalog
                .default_voice()
                .ok_or_else(|| ApplicationError::internal("Voice catalog is empty"))?,
        };

        let output_name = sanitize_output_name(cmd.output_name.as_deref());
        let job = VideoJob::new(cmd.text, voice.id.as_str().to_string(), output_name);
        let state = job.state;

        tracing::info!(
            job_id = %job.job_id,
            voice = %voice.id,
            output_name = %job.output_name,
            chars = job.text.chars().count(),
            "Submitting video job"
        );

        let job_id = self.job_manager.submit(job)?;
        Ok(SubmitVideoResponse { job_id, state })
    }
}
