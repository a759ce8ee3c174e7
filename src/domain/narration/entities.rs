//! Narration Context - Entities

use serde::{Deserialize, Serialize};

use super::value_objects::{ArtifactHandle, UnitKind};

/// 文本片段 - 一次 TTS 调用的最小单位
///
/// 不变量:
/// - index 从 0 开始，在一次运行内唯一且有序
/// - text 不可为空
/// - 除非单句本身超长，否则 text 字符数不超过 max_length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    index: usize,
    text: String,
    max_length: usize,
}

impl Segment {
    pub fn new(index: usize, text: String, max_length: usize) -> Result<Self, &'static str> {
        if text.trim().is_empty() {
            return Err("片段内容不能为空");
        }
        Ok(Self {
            index,
            text,
            max_length,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// 字符数（Unicode 标量值）
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// 单句超长导致超出预算
    pub fn is_oversized(&self) -> bool {
        self.char_count() > self.max_length
    }
}

/// 单个片段的合成结果
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub index: usize,
    pub audio: ArtifactHandle,
    /// 音频时长（秒）
    pub duration: f64,
}

/// 时间轴单元
///
/// 顺序即播放顺序，单元之间互不引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedUnit {
    pub segment_index: usize,
    pub start_offset: f64,
    pub duration: f64,
    pub kind: UnitKind,
}

impl TimedUnit {
    pub fn end_offset(&self) -> f64 {
        self.start_offset + self.duration
    }

    pub fn is_closing(&self) -> bool {
        self.kind == UnitKind::Closing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_rejects_blank_text() {
        assert!(Segment::new(0, "   ".to_string(), 10).is_err());
    }

    #[test]
    fn test_segment_oversized() {
        let segment = Segment::new(0, "Una frase demasiado larga.".to_string(), 5).unwrap();
        assert!(segment.is_oversized());
        assert_eq!(segment.char_count(), 26);
    }
}
