//! Muxer Adapter - 基于 ffmpeg 的片段渲染与合并

mod ffmpeg_muxer;

pub use ffmpeg_muxer::{FfmpegMuxer, FfmpegMuxerConfig};
