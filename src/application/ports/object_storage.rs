//! Object Storage Port - 远端对象存储上传（可选）

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// 上传错误
///
/// 上传发生在最终视频已落盘之后，失败不影响视频本身。
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Upload rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("IO error: {0}")]
    IoError(String),
}

/// Object Storage Port
#[async_trait]
pub trait ObjectStoragePort: Send + Sync {
    /// 上传本地文件，返回公开访问 URL
    async fn upload(&self, local: &Path, key: &str) -> Result<String, UploadError>;
}
