//! Textreel - 文本转旁白视频
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Narration Context: 片段、合成结果、时间轴单元、临时产物
//! - Voice Context: 音色目录
//! - 纯函数: 文本分段、时间轴、分层批量归约
//!
//! 应用层 (application/):
//! - Ports: TtsEngine, AudioProbe, CaptionRenderer, VideoMuxer, ObjectStorage, JobManager
//! - Pipeline: 产物生命周期、并发合成调度、分层合并
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: Google TTS, Symphonia 探测, 字幕帧渲染, FFmpeg, HTTP 上传
//! - Memory: JobManager 内存实现
//! - Worker: VideoWorker 后台任务处理
//! - HTTP: RESTful API

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
