//! Caption Renderer Port - 字幕帧渲染
//!
//! 对给定输入是纯函数。渲染失败返回 None，由调用方按策略决定跳过还是中止。

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 字幕帧渲染错误
#[derive(Debug, Error)]
pub enum RenderError {
    /// 渲染器没有产出图像（字体缺失、尺寸非法等）
    #[error("Renderer produced no image")]
    NoImage,

    #[error("Failed to encode frame: {0}")]
    Encode(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

/// 帧尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 320,
        }
    }
}

/// 结尾订阅卡片文案
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingCard {
    pub title: String,
    pub subtitle: String,
}

impl Default for ClosingCard {
    fn default() -> Self {
        Self {
            title: "¡SUSCRÍBETE A LECTOR DE SOMBRAS!".to_string(),
            subtitle: "Dale like y activa la campana 🔔".to_string(),
        }
    }
}

/// Caption Renderer Port
pub trait CaptionRendererPort: Send + Sync {
    /// 渲染一段旁白的字幕帧
    fn render_caption(&self, text: &str, size: FrameSize) -> Option<RgbImage>;

    /// 渲染结尾订阅卡片
    fn render_closing(&self, card: &ClosingCard, size: FrameSize) -> Option<RgbImage>;
}
