//! 结尾卡片 logo 下载
//!
//! 启动时下载一次；失败只记日志，卡片不带 logo 照常渲染。

use image::RgbaImage;
use reqwest::Client;
use std::time::Duration;

use crate::application::ports::RenderError;

/// 下载并解码 logo
pub async fn fetch_logo(url: &str, timeout: Duration) -> Result<RgbaImage, RenderError> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RenderError::Task(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RenderError::Task(format!("logo request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RenderError::Task(format!("logo request returned HTTP {}", status)));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RenderError::Task(format!("logo download failed: {}", e)))?;

    let logo = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| RenderError::Task(e.to_string()))?
        .map_err(|e| RenderError::Encode(format!("logo decode failed: {}", e)))?;

    tracing::info!(
        url = %url,
        width = logo.width(),
        height = logo.height(),
        "Closing card logo loaded"
    );
    Ok(logo.to_rgba8())
}
