//! Narration Context - Value Objects

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 临时产物唯一标识（单次运行内唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(u64);

impl ArtifactId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 产物所处的流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStage {
    /// 合成的语音
    Audio,
    /// 字幕帧图片
    CaptionImage,
    /// 单个片段渲染出的视频
    RenderedSegment,
    /// 批量合并的中间视频
    IntermediateBatch,
    /// 最终视频
    Final,
}

impl ArtifactStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactStage::Audio => "audio",
            ArtifactStage::CaptionImage => "caption_image",
            ArtifactStage::RenderedSegment => "rendered_segment",
            ArtifactStage::IntermediateBatch => "intermediate_batch",
            ArtifactStage::Final => "final",
        }
    }
}

impl std::fmt::Display for ArtifactStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 临时产物引用
///
/// 不变量:
/// - 只能由 ArtifactLifecycleManager 创建
/// - 被释放后不再被引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    id: ArtifactId,
    path: PathBuf,
    stage: ArtifactStage,
}

impl ArtifactHandle {
    pub fn new(id: ArtifactId, path: PathBuf, stage: ArtifactStage) -> Self {
        Self { id, path, stage }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stage(&self) -> ArtifactStage {
        self.stage
    }
}

/// 时间轴单元类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// 旁白（一个片段的语音 + 字幕帧）
    Narration,
    /// 结尾订阅提示片段
    Closing,
}
