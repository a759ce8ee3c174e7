//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：提交视频任务、执行视频生成

mod video_commands;

pub mod handlers;

pub use video_commands::*;
