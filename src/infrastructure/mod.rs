//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现：外部服务适配器、内存任务管理、后台 worker、HTTP 接口

pub mod adapters;
pub mod http;
pub mod memory;
pub mod worker;

pub use memory::InMemoryJobManager;
pub use worker::{VideoWorker, VideoWorkerConfig};
