//! Pipeline - 一次视频生成运行的内部组件
//!
//! - artifact_lifecycle: 临时产物登记与清理
//! - synthesis_scheduler: 有界并发 TTS 调度
//! - batch_compiler: 分层合并片段视频

mod artifact_lifecycle;
mod batch_compiler;
mod synthesis_scheduler;

pub use artifact_lifecycle::{ArtifactLifecycleManager, CleanupReport, TemporaryArtifact};
pub use batch_compiler::{BatchCompiler, CompileCause, CompileFailure, DEFAULT_BATCH_SIZE};
pub use synthesis_scheduler::{
    RetryPolicy, SchedulerConfig, SynthesisCause, SynthesisFailure, SynthesisScheduler,
    DEFAULT_CONCURRENCY_LIMIT,
};
