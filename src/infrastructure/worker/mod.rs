//! Worker Layer - Background Task Processing
//!
//! 实现 VideoWorker，从队列消费视频任务并执行生成流水线

mod video_worker;

pub use video_worker::{JobProgress, VideoWorker, VideoWorkerConfig};
