//! HTTP Object Uploader - 以 HTTP PUT 上传最终视频
//!
//! PUT {endpoint}/{key}，成功后返回 {public_base_url}/{key}

use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;

use crate::application::ports::{ObjectStoragePort, UploadError};

/// 上传配置
#[derive(Debug, Clone)]
pub struct HttpObjectUploaderConfig {
    /// PUT 目标根地址
    pub endpoint: String,
    /// 对外访问根地址
    pub public_base_url: String,
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
}

pub struct HttpObjectUploader {
    client: Client,
    config: HttpObjectUploaderConfig,
}

impl HttpObjectUploader {
    pub fn new(config: HttpObjectUploaderConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UploadError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn object_url(&self, key: &str) -> String {
        join_url(&self.config.endpoint, key)
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.config.public_base_url, key)
    }
}

fn join_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}

#[async_trait]
impl ObjectStoragePort for HttpObjectUploader {
    async fn upload(&self, local: &Path, key: &str) -> Result<String, UploadError> {
        let data = tokio::fs::read(local)
            .await
            .map_err(|e| UploadError::IoError(format!("{}: {}", local.display(), e)))?;
        let size = data.len();

        let mut request = self
            .client
            .put(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .body(data);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(url = %self.object_url(key), size = size, "Uploading video");

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        Ok(self.public_url(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("https://cdn.example.com/", "/a/b.mp4"), "https://cdn.example.com/a/b.mp4");
        assert_eq!(join_url("https://cdn.example.com", "a/b.mp4"), "https://cdn.example.com/a/b.mp4");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let uploader = HttpObjectUploader::new(HttpObjectUploaderConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            public_base_url: "http://cdn.local".to_string(),
            bearer_token: None,
            timeout_secs: 1,
        })
        .unwrap();

        let err = uploader
            .upload(Path::new("/nonexistent/video.mp4"), "job/video.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::IoError(_)));
    }
}
