//! Narration Context - 旁白视频限界上下文
//!
//! 职责:
//! - 文本片段 (Segment)
//! - 合成结果 (SynthesisResult)
//! - 时间轴单元 (TimedUnit)
//! - 临时产物引用 (ArtifactHandle)

mod entities;
mod value_objects;

pub use entities::{Segment, SynthesisResult, TimedUnit};
pub use value_objects::{ArtifactHandle, ArtifactId, ArtifactStage, UnitKind};
