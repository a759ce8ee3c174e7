//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_probe;
mod caption_renderer;
mod job_manager;
mod object_storage;
mod progress;
mod tts_engine;
mod video_muxer;

pub use audio_probe::{AudioInfo, AudioProbePort, ProbeError};
pub use caption_renderer::{CaptionRendererPort, ClosingCard, FrameSize, RenderError};
pub use job_manager::{JobError, JobFailure, JobManagerPort, JobOutput, JobState, VideoJob};
pub use object_storage::{ObjectStoragePort, UploadError};
pub use progress::{ProgressReporter, TracingProgress};
pub use tts_engine::{
    AudioFormat, SynthesisRequest, SynthesizedAudio, TtsEnginePort, TtsError,
};
pub use video_muxer::{MuxError, RenderSegmentRequest, VideoMuxerPort};
