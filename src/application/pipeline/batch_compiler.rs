//! Batch Compiler - 分层合并片段视频
//!
//! muxer 单次合并的输入数量有上限，按 batch_size 分批合并，
//! 再对中间结果重复合并，直到得到一个文件。每次合并成功后立即释放其输入。

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::application::ports::{MuxError, VideoMuxerPort};
use crate::domain::narration::{ArtifactHandle, ArtifactStage};
use crate::domain::{planned_merge_count, reduce_in_batches, ReduceError};

use super::artifact_lifecycle::ArtifactLifecycleManager;

const CREATED_BY: &str = "batch_compiler";

/// 默认单次合并数量
pub const DEFAULT_BATCH_SIZE: usize = 10;

#[derive(Debug, Error)]
pub enum CompileCause {
    #[error("no rendered segments to merge")]
    NoInput,

    #[error("batch size must be at least 2, got {0}")]
    InvalidBatchSize(usize),

    #[error(transparent)]
    Mux(#[from] MuxError),
}

/// 合并失败，指明失败的层级和批次
#[derive(Debug, Error)]
#[error("merge failed at level {level} batch {batch_index}: {cause}")]
pub struct CompileFailure {
    pub level: usize,
    pub batch_index: usize,
    pub cause: CompileCause,
}

pub struct BatchCompiler {
    muxer: Arc<dyn VideoMuxerPort>,
    lifecycle: Arc<ArtifactLifecycleManager>,
    batch_size: usize,
}

impl BatchCompiler {
    pub fn new(
        muxer: Arc<dyn VideoMuxerPort>,
        lifecycle: Arc<ArtifactLifecycleManager>,
        batch_size: usize,
    ) -> Self {
        Self {
            muxer,
            lifecycle,
            batch_size,
        }
    }

    /// 按顺序把渲染好的片段合并成一个视频
    ///
    /// 只有一个输入时不调用 muxer，直接返回该输入
    pub async fn compile(
        &self,
        rendered: Vec<ArtifactHandle>,
    ) -> Result<ArtifactHandle, CompileFailure> {
        let inputs = rendered.len();
        tracing::info!(
            inputs = inputs,
            batch_size = self.batch_size,
            planned_merges = planned_merge_count(inputs, self.batch_size),
            "Compiling segments"
        );

        let merged = reduce_in_batches(rendered, self.batch_size, |step, batch| {
            let muxer = self.muxer.clone();
            let lifecycle = self.lifecycle.clone();
            async move {
                let output = lifecycle.allocate(
                    ArtifactStage::IntermediateBatch,
                    CREATED_BY,
                    &format!("batch_l{}_{:04}.mp4", step.level, step.batch_index),
                );
                let paths: Vec<PathBuf> = batch.iter().map(|h| h.path().to_path_buf()).collect();

                tracing::debug!(
                    level = step.level,
                    batch = step.batch_index,
                    batch_count = step.batch_count,
                    inputs = paths.len(),
                    "Merging batch"
                );

                if let Err(e) = muxer.merge(&paths, output.path()).await {
                    lifecycle.release(&output).await;
                    return Err(e);
                }

                lifecycle.release_all(&batch).await;
                Ok(output)
            }
        })
        .await
        .map_err(|e| match e {
            ReduceError::Empty => CompileFailure {
                level: 0,
                batch_index: 0,
                cause: CompileCause::NoInput,
            },
            ReduceError::InvalidBatchSize(size) => CompileFailure {
                level: 0,
                batch_index: 0,
                cause: CompileCause::InvalidBatchSize(size),
            },
            ReduceError::Merge { step, source } => CompileFailure {
                level: step.level,
                batch_index: step.batch_index,
                cause: CompileCause::Mux(source),
            },
        })?;

        tracing::info!(output = %merged.path().display(), "Segments compiled");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::RenderSegmentRequest;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// 把输入文件内容按行拼接的 muxer
    #[derive(Default)]
    struct ConcatMuxer {
        fail_on_call: Option<usize>,
        calls: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl VideoMuxerPort for ConcatMuxer {
        async fn render_segment(&self, _request: &RenderSegmentRequest) -> Result<(), MuxError> {
            Ok(())
        }

        async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), MuxError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(inputs.len());
                calls.len()
            };
            if self.fail_on_call == Some(call) {
                return Err(MuxError::ProcessFailed {
                    operation: "merge",
                    status: "exit status: 1".into(),
                    stderr: "boom".into(),
                });
            }

            let mut merged = Vec::new();
            for input in inputs {
                merged.push(tokio::fs::read_to_string(input).await.unwrap());
            }
            tokio::fs::write(output, merged.join(",")).await.unwrap();
            Ok(())
        }
    }

    async fn rendered(lifecycle: &ArtifactLifecycleManager, n: usize) -> Vec<ArtifactHandle> {
        let mut handles = Vec::new();
        for i in 0..n {
            let handle = lifecycle
                .write(
                    ArtifactStage::RenderedSegment,
                    "test",
                    &format!("seg_{}.mp4", i),
                    i.to_string().as_bytes(),
                )
                .await
                .unwrap();
            handles.push(handle);
        }
        handles
    }

    #[tokio::test]
    async fn test_compile_23_preserves_order() {
        let work = tempdir().unwrap();
        let lifecycle = Arc::new(ArtifactLifecycleManager::new(work.path()).unwrap());
        let muxer = Arc::new(ConcatMuxer::default());
        let compiler = BatchCompiler::new(muxer.clone(), lifecycle.clone(), 10);

        let inputs = rendered(&lifecycle, 23).await;
        let output = compiler.compile(inputs).await.unwrap();

        let content = std::fs::read_to_string(output.path()).unwrap();
        let expected: Vec<String> = (0..23).map(|i| i.to_string()).collect();
        assert_eq!(content, expected.join(","));

        // 第一层 10 + 10 + 3，第二层 3
        assert_eq!(*muxer.calls.lock().unwrap(), vec![10, 10, 3, 3]);
        // 只剩最终文件
        assert_eq!(lifecycle.live_count(), 1);
        assert_eq!(output.stage(), ArtifactStage::IntermediateBatch);
    }

    #[tokio::test]
    async fn test_single_input_is_returned_without_merge() {
        let work = tempdir().unwrap();
        let lifecycle = Arc::new(ArtifactLifecycleManager::new(work.path()).unwrap());
        let muxer = Arc::new(ConcatMuxer::default());
        let compiler = BatchCompiler::new(muxer.clone(), lifecycle.clone(), 10);

        let inputs = rendered(&lifecycle, 1).await;
        let expected = inputs[0].clone();
        let output = compiler.compile(inputs).await.unwrap();

        assert_eq!(output, expected);
        assert!(muxer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let work = tempdir().unwrap();
        let lifecycle = Arc::new(ArtifactLifecycleManager::new(work.path()).unwrap());
        let compiler = BatchCompiler::new(Arc::new(ConcatMuxer::default()), lifecycle, 10);

        let failure = compiler.compile(Vec::new()).await.unwrap_err();
        assert!(matches!(failure.cause, CompileCause::NoInput));
    }

    #[tokio::test]
    async fn test_merge_failure_reports_position_and_stops() {
        let work = tempdir().unwrap();
        let lifecycle = Arc::new(ArtifactLifecycleManager::new(work.path()).unwrap());
        let muxer = Arc::new(ConcatMuxer {
            fail_on_call: Some(2),
            ..Default::default()
        });
        let compiler = BatchCompiler::new(muxer.clone(), lifecycle.clone(), 10);

        let inputs = rendered(&lifecycle, 23).await;
        let failure = compiler.compile(inputs).await.unwrap_err();

        assert_eq!(failure.level, 0);
        assert_eq!(failure.batch_index, 1);
        assert_eq!(muxer.calls.lock().unwrap().len(), 2);

        // 剩余产物仍在登记表中，teardown 后全部清除
        assert!(lifecycle.live_count() > 0);
        lifecycle.teardown().await;
        assert_eq!(lifecycle.live_count(), 0);
    }
}
