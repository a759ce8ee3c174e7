//! Voice Context - Errors

use thiserror::Error;

use super::VoiceId;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("音色不存在: {0}")]
    NotFound(VoiceId),

    #[error("无效的音色标识: {0}")]
    InvalidId(String),
}
