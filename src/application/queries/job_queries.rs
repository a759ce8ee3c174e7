//! Job Queries - 视频任务查询

/// 查询任务状态
#[derive(Debug, Clone)]
pub struct GetJobStatus {
    pub job_id: String,
}

/// 获取已完成任务的输出文件
#[derive(Debug, Clone)]
pub struct GetJobOutput {
    pub job_id: String,
}
