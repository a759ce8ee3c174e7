//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、CaptionRenderer、VideoMuxer、JobManager 等）
//! - pipeline: 单次运行的内部组件（产物生命周期、合成调度、分层合并）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod pipeline;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    sanitize_output_name,
    GenerateVideoCommand,
    RenderFailurePolicy,
    SubmitVideoCommand,
    SubmitVideoResponse,
    VideoOutcome,
    DEFAULT_OUTPUT_NAME,
    // Handlers
    handlers::{GenerateVideoHandler, PipelineSettings, SubmitVideoHandler},
};

pub use error::{ApplicationError, PipelineError};

pub use pipeline::{
    ArtifactLifecycleManager, BatchCompiler, RetryPolicy, SchedulerConfig, SynthesisScheduler,
};

pub use ports::{
    // Audio probe
    AudioInfo,
    AudioProbePort,
    ProbeError,
    // Caption renderer
    CaptionRendererPort,
    ClosingCard,
    FrameSize,
    RenderError,
    // Job manager
    JobError,
    JobFailure,
    JobManagerPort,
    JobOutput,
    JobState,
    VideoJob,
    // Object storage
    ObjectStoragePort,
    UploadError,
    // Progress
    ProgressReporter,
    TracingProgress,
    // TTS engine
    AudioFormat,
    SynthesisRequest,
    SynthesizedAudio,
    TtsEnginePort,
    TtsError,
    // Video muxer
    MuxError,
    RenderSegmentRequest,
    VideoMuxerPort,
};

pub use queries::{
    GetJobOutput,
    GetJobStatus,
    GetVoice,
    ListVoices,
    // Handlers
    handlers::{
        GetJobOutputHandler, GetJobStatusHandler, GetVoiceHandler, JobOutputFile,
        JobStatusResponse, ListVoicesHandler, VoiceResponse,
    },
};
