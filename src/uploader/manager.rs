// 上传管理器
//
// 对外提供两种上传方式：
// - upload_file: 单文件，阻塞执行，错误直接返回给调用方
// - upload_files: 多文件，列表只获取一次，逐个分配文件名后并发上传，
//   最后汇总为 BatchReport，不向调用方返回错误
//
// 并发策略：
// - 使用 Semaphore 限制同时存在的 FTP 连接数
// - 使用 JoinSet 管理上传任务，每个任务持有独立的连接
// - 单个文件失败不影响其他文件

use crate::config::{FtpConfig, UploadConfig};
use crate::remote::{DirectoryLister, FtpConnector, StdFtpConnector, UploadError};
use crate::uploader::{NameResolver, RemoteNamer, UploadEngine, UploadTask};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// 批量上传的整体结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// 全部成功
    AllSucceeded,
    /// 至少一个文件失败
    SomeFailed,
}

/// 批量上传报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// 整体状态
    pub status: BatchStatus,
    /// 每个文件的上传记录，顺序与输入一致
    pub tasks: Vec<UploadTask>,
}

impl BatchReport {
    fn from_tasks(tasks: Vec<UploadTask>) -> Self {
        let status = if tasks.iter().all(|t| t.is_completed()) {
            BatchStatus::AllSucceeded
        } else {
            BatchStatus::SomeFailed
        };
        Self { status, tasks }
    }

    pub fn all_succeeded(&self) -> bool {
        self.status == BatchStatus::AllSucceeded
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &UploadTask> {
        self.tasks.iter().filter(|t| t.is_completed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UploadTask> {
        self.tasks.iter().filter(|t| !t.is_completed())
    }

    /// 第一个失败文件的错误信息
    pub fn first_error(&self) -> Option<&str> {
        self.failed().find_map(|t| t.error.as_deref())
    }

    /// 一行汇总信息
    pub fn summary(&self) -> String {
        match self.status {
            BatchStatus::AllSucceeded => format!("全部 {} 个文件上传成功", self.tasks.len()),
            BatchStatus::SomeFailed => format!(
                "{} 个文件上传失败（共 {} 个），首个错误: {}",
                self.failed().count(),
                self.tasks.len(),
                self.first_error().unwrap_or("未知错误")
            ),
        }
    }
}

/// 上传管理器
///
/// 绑定一个 FTP 服务器和一组凭证，可重复使用
#[derive(Clone)]
pub struct UploadManager {
    config: Arc<FtpConfig>,
    upload: UploadConfig,
    connector: Arc<dyn FtpConnector>,
}

impl UploadManager {
    /// 使用真实 FTP 连接创建管理器
    pub fn new(config: FtpConfig, upload: UploadConfig) -> Self {
        Self::with_connector(config, upload, Arc::new(StdFtpConnector))
    }

    /// 使用指定的连接器创建管理器
    pub fn with_connector(
        config: FtpConfig,
        upload: UploadConfig,
        connector: Arc<dyn FtpConnector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            upload,
            connector,
        }
    }

    pub fn config(&self) -> &FtpConfig {
        &self.config
    }

    pub fn lister(&self) -> DirectoryLister {
        DirectoryLister::new(
            self.connector.clone(),
            self.config.clone(),
            self.upload.timeout(),
        )
    }

    fn engine(&self) -> UploadEngine {
        UploadEngine::new(self.connector.clone(), self.config.clone(), self.upload.clone())
    }

    /// 上传单个文件（阻塞）
    ///
    /// 获取列表 -> 处理文件名冲突 -> 上传，任何一步失败都直接返回错误
    pub fn upload_file(&self, local_path: &Path) -> Result<UploadTask, UploadError> {
        let listing = self.lister().list()?;

        let mut namer = RemoteNamer::new(
            NameResolver::single_file(),
            self.upload.fresh_name,
            listing,
        );
        let remote_name = namer.assign(local_path)?;

        let mut task = UploadTask::new(local_path.to_path_buf(), remote_name);
        self.engine().upload(&mut task)?;
        Ok(task)
    }

    /// 并发上传多个文件
    ///
    /// # 流程
    /// 1. 获取一次远程列表
    /// 2. 按输入顺序逐个分配文件名（分配结果追加到内存列表，批次内不重名）
    /// 3. 每个文件启动一个上传任务，同时运行的任务数不超过 `max_concurrent_tasks`
    /// 4. 等待全部任务结束后汇总
    pub async fn upload_files(&self, local_paths: Vec<PathBuf>) -> BatchReport {
        let total = local_paths.len();
        if total == 0 {
            info!("没有需要上传的文件");
            return BatchReport::from_tasks(Vec::new());
        }

        info!(
            "开始批量上传 {} 个文件，最大并发连接数: {}",
            total, self.upload.max_concurrent_tasks
        );

        // 1. 获取列表
        let lister = self.lister();
        let listing = match tokio::task::spawn_blocking(move || lister.list()).await {
            Ok(Ok(listing)) => listing,
            Ok(Err(e)) => return Self::fail_all(local_paths, &e),
            Err(e) => {
                return Self::fail_all(local_paths, &UploadError::TaskPanicked(e.to_string()))
            }
        };

        // 2-3. 分配文件名并启动上传
        let mut namer = RemoteNamer::new(NameResolver::batch(), self.upload.fresh_name, listing);
        let semaphore = Arc::new(Semaphore::new(self.upload.max_concurrent_tasks.max(1)));
        let mut join_set: JoinSet<(usize, UploadTask)> = JoinSet::new();

        // launched[i] 保存已启动任务的初始记录，任务异常退出时用它补全结果
        let mut launched: Vec<Option<UploadTask>> = vec![None; total];
        let mut finished: Vec<Option<UploadTask>> = vec![None; total];

        info!("正在上传所有文件...");
        for (index, local_path) in local_paths.into_iter().enumerate() {
            let remote_name = match namer.assign(&local_path) {
                Ok(name) => name,
                Err(e) => {
                    warn!("无法为文件分配远程文件名: {}", e);
                    let mut task = UploadTask::new(local_path, String::new());
                    task.mark_failed(e.to_string());
                    finished[index] = Some(task);
                    continue;
                }
            };

            let task = UploadTask::new(local_path, remote_name);
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    let mut task = task;
                    task.mark_failed(UploadError::TaskPanicked(e.to_string()).to_string());
                    finished[index] = Some(task);
                    continue;
                }
            };

            launched[index] = Some(task.clone());
            let engine = self.engine();
            join_set.spawn_blocking(move || {
                let mut task = task;
                // 错误已记录在 task 中
                let _ = engine.upload(&mut task);
                drop(permit);
                (index, task)
            });
        }

        // 4. 等待全部完成
        let mut done = 0usize;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((index, task)) => {
                    done += 1;
                    if task.is_completed() {
                        info!("[{}/{}] 上传完成: {}", done, total, task.remote_name);
                    } else {
                        warn!(
                            "[{}/{}] 上传失败: {}: {}",
                            done,
                            total,
                            task.remote_name,
                            task.error.as_deref().unwrap_or("未知错误")
                        );
                    }
                    finished[index] = Some(task);
                }
                Err(e) => {
                    error!("上传任务异常: {}", e);
                }
            }
        }

        let tasks: Vec<UploadTask> = finished
            .into_iter()
            .zip(launched)
            .map(|(finished, launched)| match (finished, launched) {
                (Some(task), _) => task,
                (None, Some(mut task)) => {
                    task.mark_failed(UploadError::TaskPanicked("任务未返回结果".to_string()).to_string());
                    task
                }
                (None, None) => {
                    let mut task = UploadTask::new(PathBuf::new(), String::new());
                    task.mark_failed("任务未启动".to_string());
                    task
                }
            })
            .collect();

        let report = BatchReport::from_tasks(tasks);
        if report.all_succeeded() {
            info!("所有文件上传完成！");
        } else {
            error!("部分文件上传失败: {}", report.summary());
        }
        report
    }

    fn fail_all(local_paths: Vec<PathBuf>, err: &UploadError) -> BatchReport {
        error!("获取 FTP 文件列表失败，取消本次上传: {}", err);
        let tasks = local_paths
            .into_iter()
            .map(|path| {
                let mut task = UploadTask::new(path, String::new());
                task.mark_failed(err.to_string());
                task
            })
            .collect();
        BatchReport::from_tasks(tasks)
    }
}
