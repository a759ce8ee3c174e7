//! 应用层错误定义
//!
//! - ApplicationError: 命令/查询的同步错误（参数校验、资源不存在等）
//! - PipelineError: 一次视频生成运行的终止错误，指明阶段和出错的片段/批次

use thiserror::Error;

use crate::application::pipeline::{CompileCause, CompileFailure, SynthesisCause, SynthesisFailure};
use crate::application::ports::JobError;
use crate::domain::voice::VoiceError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 服务暂不可用（任务队列已满或已关闭）
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            id: id.into(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<VoiceError> for ApplicationError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::NotFound(id) => Self::not_found("Voice", id.as_str()),
            VoiceError::InvalidId(id) => Self::validation(format!("Invalid voice id: {:?}", id)),
        }
    }
}

impl From<JobError> for ApplicationError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => Self::not_found("Job", id),
            JobError::QueueUnavailable(msg) => Self::ServiceUnavailable(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

fn describe_unit(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("segment {}", i),
        None => "closing clip".to_string(),
    }
}

/// 视频生成运行的终止错误
///
/// Display 形如 `<stage> failed at <kind> <index>: <cause>`
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 输入无效（空文本、未知音色、片段为空）
    #[error("segmentation failed: {0}")]
    InvalidInput(String),

    /// 某个片段合成终止失败
    #[error(
        "synthesis failed at segment {segment_index} ({completed}/{total} segments completed): {cause}"
    )]
    Synthesis {
        segment_index: usize,
        completed: usize,
        total: usize,
        cause: SynthesisCause,
    },

    /// 字幕帧或片段视频渲染失败；segment_index 为 None 表示结尾片段
    #[error("render failed at {}: {message}", describe_unit(.segment_index))]
    Render {
        segment_index: Option<usize>,
        message: String,
    },

    /// 分层合并失败
    #[error("merge failed at batch {batch_index} (level {level}): {cause}")]
    Merge {
        level: usize,
        batch_index: usize,
        cause: CompileCause,
    },

    /// 最终视频落盘失败
    #[error("persist failed: {0}")]
    Persist(String),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn render(segment_index: Option<usize>, message: impl Into<String>) -> Self {
        Self::Render {
            segment_index,
            message: message.into(),
        }
    }

    /// 出错的阶段
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "segmentation",
            PipelineError::Synthesis { .. } => "synthesis",
            PipelineError::Render { .. } => "render",
            PipelineError::Merge { .. } => "merge",
            PipelineError::Persist(_) => "persist",
            PipelineError::Internal(_) => "internal",
        }
    }

    /// 出错的片段 index（合成/渲染）或批次 index（合并）
    pub fn index(&self) -> Option<usize> {
        match self {
            PipelineError::Synthesis { segment_index, .. } => Some(*segment_index),
            PipelineError::Render { segment_index, .. } => *segment_index,
            PipelineError::Merge { batch_index, .. } => Some(*batch_index),
            _ => None,
        }
    }
}

impl From<SynthesisFailure> for PipelineError {
    fn from(failure: SynthesisFailure) -> Self {
        Self::Synthesis {
            segment_index: failure.segment_index,
            completed: failure.completed,
            total: failure.total,
            cause: failure.cause,
        }
    }
}

impl From<CompileFailure> for PipelineError {
    fn from(failure: CompileFailure) -> Self {
        Self::Merge {
            level: failure.level,
            batch_index: failure.batch_index,
            cause: failure.cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TtsError;

    #[test]
    fn test_pipeline_error_names_stage_and_index() {
        let err = PipelineError::from(SynthesisFailure {
            segment_index: 4,
            completed: 3,
            total: 10,
            cause: SynthesisCause::Fatal(TtsError::Timeout),
        });
        assert_eq!(err.stage(), "synthesis");
        assert_eq!(err.index(), Some(4));
        assert_eq!(
            err.to_string(),
            "synthesis failed at segment 4 (3/10 segments completed): Request timeout"
        );
    }

    #[test]
    fn test_render_error_on_closing_clip() {
        let err = PipelineError::render(None, "no font");
        assert_eq!(err.index(), None);
        assert_eq!(err.to_string(), "render failed at closing clip: no font");
    }

    #[test]
    fn test_merge_error_reports_batch() {
        let err = PipelineError::from(CompileFailure {
            level: 1,
            batch_index: 2,
            cause: CompileCause::NoInput,
        });
        assert_eq!(err.stage(), "merge");
        assert_eq!(err.index(), Some(2));
    }
}
