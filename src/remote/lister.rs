// 远程目录列表获取

use super::{FtpConnector, UploadError};
use crate::config::FtpConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 目录列表获取器
///
/// 每次调用 `list` 都会新建连接重新获取，不做缓存
#[derive(Clone)]
pub struct DirectoryLister {
    connector: Arc<dyn FtpConnector>,
    config: Arc<FtpConfig>,
    timeout: Duration,
}

impl DirectoryLister {
    pub fn new(connector: Arc<dyn FtpConnector>, config: Arc<FtpConfig>, timeout: Duration) -> Self {
        Self {
            connector,
            config,
            timeout,
        }
    }

    /// 获取目标目录的文件列表
    ///
    /// 返回服务器原始行，保留顺序和重复项，不做解析
    pub fn list(&self) -> Result<Vec<String>, UploadError> {
        info!(
            "正在获取 FTP 文件列表: {} ({})",
            self.config.socket_addr(),
            self.config.remote_dir()
        );

        let mut session = self.connector.connect(&self.config, self.timeout)?;
        let result = session.list();
        session.quit();

        let entries = result?;
        for entry in &entries {
            info!("发现文件: {}", entry);
        }
        info!("文件列表获取完成，共 {} 项", entries.len());

        Ok(entries)
    }
}
