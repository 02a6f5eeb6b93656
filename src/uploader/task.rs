// 上传任务定义

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// 上传任务状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadTaskStatus {
    /// 等待中
    Pending,
    /// 上传中
    Uploading,
    /// 已完成
    Completed,
    /// 失败
    Failed,
}

/// 单个文件的上传记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    /// 任务ID
    pub id: String,
    /// 本地文件路径
    pub local_path: PathBuf,
    /// 远程文件名（冲突处理后）
    pub remote_name: String,
    /// 文件大小
    pub total_size: u64,
    /// 已上传大小
    pub uploaded_size: u64,
    /// 任务状态
    pub status: UploadTaskStatus,
    /// 创建时间 (Unix timestamp)
    pub created_at: i64,
    /// 开始时间 (Unix timestamp)
    pub started_at: Option<i64>,
    /// 完成时间 (Unix timestamp)
    pub completed_at: Option<i64>,
    /// 错误信息
    pub error: Option<String>,
}

impl UploadTask {
    /// 创建新的上传任务
    pub fn new(local_path: PathBuf, remote_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            local_path,
            remote_name,
            total_size: 0,
            uploaded_size: 0,
            status: UploadTaskStatus::Pending,
            created_at: chrono::Utc::now().timestamp(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// 计算进度百分比
    pub fn progress(&self) -> f64 {
        if self.total_size == 0 {
            return if self.status == UploadTaskStatus::Completed {
                100.0
            } else {
                0.0
            };
        }
        (self.uploaded_size as f64 / self.total_size as f64) * 100.0
    }

    pub fn is_completed(&self) -> bool {
        self.status == UploadTaskStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == UploadTaskStatus::Failed
    }

    /// 标记为上传中
    pub fn mark_uploading(&mut self, total_size: u64) {
        self.status = UploadTaskStatus::Uploading;
        self.total_size = total_size;
        if self.started_at.is_none() {
            self.started_at = Some(chrono::Utc::now().timestamp());
        }
    }

    /// 标记为已完成，`uploaded_size` 保持实际写出的字节数
    pub fn mark_completed(&mut self) {
        self.status = UploadTaskStatus::Completed;
        self.completed_at = Some(chrono::Utc::now().timestamp());
    }

    /// 标记为失败，已写入的部分不回滚
    pub fn mark_failed(&mut self, error: String) {
        self.status = UploadTaskStatus::Failed;
        self.completed_at = Some(chrono::Utc::now().timestamp());
        self.error = Some(error);
    }
}
