//! Progress Reporter Port - 进度上报

/// 进度上报
///
/// fraction 取值 0.0..=1.0，stage 为人类可读的阶段描述
pub trait ProgressReporter: Send + Sync {
    fn report(&self, fraction: f32, stage: &str);
}

/// 只写日志的进度上报
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn report(&self, fraction: f32, stage: &str) {
        tracing::debug!(progress = fraction, stage = %stage, "Pipeline progress");
    }
}
