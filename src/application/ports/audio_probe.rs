//! Audio Probe Port - 音频时长探测
//!
//! TTS 引擎不返回时长时，用它从音频字节中测量

use thiserror::Error;

use super::tts_engine::AudioFormat;

/// 探测错误
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// 音频信息
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    /// 时长（秒）
    pub duration_secs: f64,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

/// Audio Probe Port
///
/// 纯 CPU 计算，调用方负责放到阻塞线程池中执行
pub trait AudioProbePort: Send + Sync {
    fn probe(&self, data: &[u8], format: AudioFormat) -> Result<AudioInfo, ProbeError>;
}
