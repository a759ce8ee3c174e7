//! Artifact Lifecycle Manager - 临时产物生命周期
//!
//! 每次运行一个实例，持有独立的临时目录和产物登记表：
//! - 产物在创建前登记，保证写到一半失败的文件也能被清理
//! - 交接给下一阶段后立即释放，每个产物只会被删除一次
//! - teardown 删除所有仍在登记表中的产物，单个删除失败只记日志，不影响运行结果
//! - Drop 兜底：运行的 future 被丢弃或 panic 时同样清理

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::fs;
use uuid::Uuid;

use crate::domain::narration::{ArtifactHandle, ArtifactId, ArtifactStage};

/// 登记表中的一条临时产物
#[derive(Debug, Clone)]
pub struct TemporaryArtifact {
    pub handle: ArtifactHandle,
    pub created_by: &'static str,
    pub created_at: DateTime<Utc>,
}

/// teardown 结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// 成功删除（或本就不存在）的产物数
    pub removed: usize,
    /// 删除失败的产物数
    pub failed: usize,
}

/// 临时产物生命周期管理器
pub struct ArtifactLifecycleManager {
    run_id: Uuid,
    root: PathBuf,
    temp_dir: Mutex<Option<TempDir>>,
    registry: DashMap<ArtifactId, TemporaryArtifact>,
    next_id: AtomicU64,
}

impl ArtifactLifecycleManager {
    /// 在 work_dir 下创建本次运行的临时目录
    pub fn new(work_dir: impl AsRef<Path>) -> io::Result<Self> {
        let work_dir = work_dir.as_ref();
        std::fs::create_dir_all(work_dir)?;

        let run_id = Uuid::new_v4();
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("run-{}-", run_id.simple()))
            .tempdir_in(work_dir)?;
        let root = temp_dir.path().to_path_buf();

        tracing::debug!(run_id = %run_id, root = %root.display(), "Artifact workspace created");

        Ok(Self {
            run_id,
            root,
            temp_dir: Mutex::new(Some(temp_dir)),
            registry: DashMap::new(),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// 本次运行的临时目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 登记一个即将创建的产物，返回其路径句柄
    ///
    /// 文件名加上产物编号前缀，同一次运行内不会冲突
    pub fn allocate(
        &self,
        stage: ArtifactStage,
        created_by: &'static str,
        file_name: &str,
    ) -> ArtifactHandle {
        let id = ArtifactId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let path = self.root.join(format!("{:06}_{}", id.value(), file_name));
        let handle = ArtifactHandle::new(id, path, stage);

        self.registry.insert(
            id,
            TemporaryArtifact {
                handle: handle.clone(),
                created_by,
                created_at: Utc::now(),
            },
        );

        tracing::trace!(
            artifact = %id,
            stage = %stage,
            created_by = created_by,
            "Artifact registered"
        );
        handle
    }

    /// 登记并写入产物
    pub async fn write(
        &self,
        stage: ArtifactStage,
        created_by: &'static str,
        file_name: &str,
        data: &[u8],
    ) -> io::Result<ArtifactHandle> {
        let handle = self.allocate(stage, created_by, file_name);

        if let Err(e) = fs::write(handle.path(), data).await {
            self.release(&handle).await;
            return Err(e);
        }

        Ok(handle)
    }

    /// 释放产物：从登记表移除并删除文件
    ///
    /// 返回 false 表示该产物已经不在登记表中（已释放或已持久化），不会重复删除
    pub async fn release(&self, handle: &ArtifactHandle) -> bool {
        let Some((_, artifact)) = self.registry.remove(&handle.id()) else {
            return false;
        };

        if let Err(e) = remove_artifact_file(artifact.handle.path()).await {
            tracing::warn!(
                artifact = %handle.id(),
                stage = %handle.stage(),
                path = %handle.path().display(),
                error = %e,
                "Failed to remove artifact"
            );
        }
        true
    }

    /// 批量释放
    pub async fn release_all(&self, handles: &[ArtifactHandle]) {
        for handle in handles {
            self.release(handle).await;
        }
    }

    /// 更改产物阶段（例如中间批次成为最终产物），文件不动
    pub fn promote(&self, handle: &ArtifactHandle, stage: ArtifactStage) -> ArtifactHandle {
        let promoted = ArtifactHandle::new(handle.id(), handle.path().to_path_buf(), stage);
        if let Some(mut entry) = self.registry.get_mut(&handle.id()) {
            entry.handle = promoted.clone();
        }
        promoted
    }

    /// 持久化：把产物移出临时目录，并从登记表移除
    ///
    /// 移动失败时产物保留在登记表中，由 teardown 清理
    pub async fn persist(&self, handle: &ArtifactHandle, dest: &Path) -> io::Result<PathBuf> {
        if !self.registry.contains_key(&handle.id()) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("artifact {} is not registered", handle.id()),
            ));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        if fs::rename(handle.path(), dest).await.is_err() {
            // 跨文件系统时 rename 失败，退化为复制
            fs::copy(handle.path(), dest).await?;
        }

        self.release(handle).await;

        tracing::info!(
            artifact = %handle.id(),
            dest = %dest.display(),
            "Artifact persisted"
        );
        Ok(dest.to_path_buf())
    }

    /// 仍在登记表中的产物数
    pub fn live_count(&self) -> usize {
        self.registry.len()
    }

    /// 仍在登记表中的产物（按编号排序）
    #[cfg(test)]
    pub fn live_artifacts(&self) -> Vec<TemporaryArtifact> {
        let mut artifacts: Vec<_> = self.registry.iter().map(|e| e.value().clone()).collect();
        artifacts.sort_by_key(|a| a.handle.id());
        artifacts
    }

    /// 清理所有剩余产物和临时目录
    ///
    /// 永远不返回错误，失败只记日志
    pub async fn teardown(&self) -> CleanupReport {
        let mut report = CleanupReport::default();

        let ids: Vec<ArtifactId> = self.registry.iter().map(|e| *e.key()).collect();
        for id in ids {
            let Some((_, artifact)) = self.registry.remove(&id) else {
                continue;
            };

            match remove_artifact_file(artifact.handle.path()).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        artifact = %id,
                        stage = %artifact.handle.stage(),
                        created_by = artifact.created_by,
                        error = %e,
                        "Failed to remove artifact during teardown"
                    );
                }
            }
        }

        let temp_dir = self.temp_dir.lock().ok().and_then(|mut guard| guard.take());
        if let Some(temp_dir) = temp_dir {
            if let Err(e) = temp_dir.close() {
                tracing::warn!(
                    run_id = %self.run_id,
                    error = %e,
                    "Failed to remove artifact workspace"
                );
            }
        }

        tracing::debug!(
            run_id = %self.run_id,
            removed = report.removed,
            failed = report.failed,
            "Artifact teardown finished"
        );
        report
    }
}

impl Drop for ArtifactLifecycleManager {
    fn drop(&mut self) {
        if self.registry.is_empty() {
            return;
        }

        tracing::warn!(
            run_id = %self.run_id,
            remaining = self.registry.len(),
            "Artifact manager dropped without teardown, cleaning up"
        );
        for entry in self.registry.iter() {
            let path = entry.value().handle.path();
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove artifact");
                }
            }
        }
        self.registry.clear();
        // TempDir 在字段 drop 时删除整个目录
    }
}

/// 删除文件，文件不存在视为成功
async fn remove_artifact_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_and_release() {
        let work = tempdir().unwrap();
        let manager = ArtifactLifecycleManager::new(work.path()).unwrap();

        let handle = manager
            .write(ArtifactStage::Audio, "test", "audio_0.mp3", b"data")
            .await
            .unwrap();
        assert!(handle.path().exists());
        assert!(handle.path().starts_with(manager.root()));
        assert_eq!(manager.live_count(), 1);

        assert!(manager.release(&handle).await);
        assert!(!handle.path().exists());
        assert_eq!(manager.live_count(), 0);

        // 第二次释放是空操作
        assert!(!manager.release(&handle).await);
    }

    #[tokio::test]
    async fn test_allocated_but_never_written_is_cleaned() {
        let work = tempdir().unwrap();
        let manager = ArtifactLifecycleManager::new(work.path()).unwrap();

        manager.allocate(ArtifactStage::RenderedSegment, "test", "segment.mp4");
        let report = manager.teardown().await;
        assert_eq!(report, CleanupReport { removed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn test_teardown_removes_everything() {
        let work = tempdir().unwrap();
        let manager = ArtifactLifecycleManager::new(work.path()).unwrap();
        let root = manager.root().to_path_buf();

        let mut paths = Vec::new();
        for i in 0..5 {
            let handle = manager
                .write(ArtifactStage::Audio, "test", &format!("audio_{}.mp3", i), b"x")
                .await
                .unwrap();
            paths.push(handle.path().to_path_buf());
        }

        let report = manager.teardown().await;
        assert_eq!(report.removed, 5);
        assert_eq!(manager.live_count(), 0);
        assert!(paths.iter().all(|p| !p.exists()));
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_persist_moves_out_of_registry() {
        let work = tempdir().unwrap();
        let out = tempdir().unwrap();
        let manager = ArtifactLifecycleManager::new(work.path()).unwrap();

        let handle = manager
            .write(ArtifactStage::IntermediateBatch, "test", "final.mp4", b"video")
            .await
            .unwrap();
        let handle = manager.promote(&handle, ArtifactStage::Final);
        assert_eq!(manager.live_artifacts()[0].handle.stage(), ArtifactStage::Final);

        let dest = out.path().join("job").join("video.mp4");
        let persisted = manager.persist(&handle, &dest).await.unwrap();

        assert_eq!(persisted, dest);
        assert_eq!(std::fs::read(&dest).unwrap(), b"video");
        assert_eq!(manager.live_count(), 0);

        manager.teardown().await;
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_drop_without_teardown_cleans_up() {
        let work = tempdir().unwrap();
        let manager = ArtifactLifecycleManager::new(work.path()).unwrap();
        let root = manager.root().to_path_buf();
        let handle = manager
            .write(ArtifactStage::Audio, "test", "audio.mp3", b"x")
            .await
            .unwrap();

        drop(manager);
        assert!(!handle.path().exists());
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let work = tempdir().unwrap();
        let manager = std::sync::Arc::new(ArtifactLifecycleManager::new(work.path()).unwrap());

        let mut tasks = Vec::new();
        for i in 0..16 {
            let manager = manager.clone();
            tasks.push(tokio::spawn(async move {
                manager
                    .write(ArtifactStage::Audio, "test", &format!("a{}.mp3", i), b"x")
                    .await
                    .unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(manager.live_count(), 16);
        assert_eq!(manager.teardown().await.removed, 16);
    }
}
