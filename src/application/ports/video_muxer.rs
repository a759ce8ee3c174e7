//! Video Muxer Port - 音视频封装
//!
//! 把静态帧 + 音频渲染成片段视频，以及把多个片段按顺序合并

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 封装错误
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("Failed to spawn {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{operation} exited with {status}: {stderr}")]
    ProcessFailed {
        operation: &'static str,
        status: String,
        stderr: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 单个片段渲染请求
#[derive(Debug, Clone)]
pub struct RenderSegmentRequest {
    /// 字幕帧图片
    pub image: PathBuf,
    /// 旁白音频；None 表示静音（结尾片段）
    pub audio: Option<PathBuf>,
    /// 在最终视频中的起始时间（秒）
    pub start_offset: f64,
    /// 片段时长（秒）
    pub duration: f64,
    /// 输出文件
    pub output: PathBuf,
}

/// Video Muxer Port
///
/// merge 必须保持输入顺序；单次 merge 的输入数量有上限，由 BatchCompiler 控制。
#[async_trait]
pub trait VideoMuxerPort: Send + Sync {
    /// 渲染单个片段视频
    async fn render_segment(&self, request: &RenderSegmentRequest) -> Result<(), MuxError>;

    /// 按顺序合并多个视频
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MuxError>;
}
