//! Video Commands - 视频生成相关命令

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::ports::{JobState, UploadError};
use crate::domain::narration::TimedUnit;

/// 未指定输出名时使用的文件名
pub const DEFAULT_OUTPUT_NAME: &str = "video_generado";

/// 输出名最大长度
pub const MAX_OUTPUT_NAME_LEN: usize = 100;

/// 规范化输出文件名：只保留 `[A-Za-z0-9_-]`，空则使用默认名
pub fn sanitize_output_name(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_OUTPUT_NAME_LEN)
        .collect();

    if cleaned.is_empty() {
        DEFAULT_OUTPUT_NAME.to_string()
    } else {
        cleaned
    }
}

/// 字幕帧渲染失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFailurePolicy {
    /// 中止整个运行
    #[default]
    Abort,
    /// 丢弃该片段（连同音频），继续生成
    Skip,
}

/// 提交视频任务命令
#[derive(Debug, Clone)]
pub struct SubmitVideoCommand {
    pub text: String,
    /// 为空时使用目录中的默认音色
    pub voice_id: Option<String>,
    pub output_name: Option<String>,
}

/// 提交视频任务响应
#[derive(Debug, Clone)]
pub struct SubmitVideoResponse {
    pub job_id: String,
    pub state: JobState,
}

/// 执行一次视频生成
#[derive(Debug, Clone)]
pub struct GenerateVideoCommand {
    pub job_id: String,
    pub text: String,
    pub voice_id: String,
    /// 已规范化的输出名
    pub output_name: String,
}

/// 视频生成结果
#[derive(Debug)]
pub struct VideoOutcome {
    /// 最终视频在输出目录中的位置
    pub output_path: PathBuf,
    /// 成功生成的旁白片段数
    pub segment_count: usize,
    /// 因渲染失败被跳过的片段
    pub skipped_segments: Vec<usize>,
    pub duration_seconds: f64,
    pub timeline: Vec<TimedUnit>,
    /// None 表示未启用上传
    pub upload: Option<Result<String, UploadError>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_output_name() {
        assert_eq!(sanitize_output_name(Some("mi video: parte 1!")), "mivideoparte1");
        assert_eq!(sanitize_output_name(Some("historia_de-miedo")), "historia_de-miedo");
        assert_eq!(sanitize_output_name(Some("../../etc/passwd")), "etcpasswd");
    }

    #[test]
    fn test_sanitize_output_name_defaults() {
        assert_eq!(sanitize_output_name(None), DEFAULT_OUTPUT_NAME);
        assert_eq!(sanitize_output_name(Some("¿¡!?")), DEFAULT_OUTPUT_NAME);
    }

    #[test]
    fn test_sanitize_output_name_truncates() {
        let long = "a".repeat(300);
        assert_eq!(sanitize_output_name(Some(&long)).len(), MAX_OUTPUT_NAME_LEN);
    }

    #[test]
    fn test_render_policy_parse() {
        let policy: RenderFailurePolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, RenderFailurePolicy::Skip);
        assert_eq!(RenderFailurePolicy::default(), RenderFailurePolicy::Abort);
    }
}
