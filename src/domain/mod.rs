//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Narration Context: 片段、合成结果、时间轴单元、临时产物
//! - Voice Context: 音色目录
//!
//! 以及三个纯函数组件:
//! - text_segmenter: 文本 → 有序片段
//! - timeline: 时长 → 起始偏移
//! - reduction: 分层批量归约

pub mod narration;
pub mod reduction;
pub mod timeline;
pub mod voice;

mod text_segmenter;

pub use reduction::{plan_batches, planned_merge_count, reduce_in_batches, MergeStep, ReduceError};
pub use text_segmenter::{
    segment_text, split_into_sentences, SegmentConfig, DEFAULT_MAX_CHARS,
};
pub use timeline::{build_timeline, total_duration, DEFAULT_CLOSING_DURATION_SECS};
