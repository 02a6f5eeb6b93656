// FTP 远程访问模块
//
// 上传流程只依赖两个能力：列出目标目录、向目标目录写入文件。
// 这里用 trait 把它们和具体的 FTP 客户端隔开，测试时替换为内存实现。

pub mod client;
pub mod lister;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::StdFtpConnector;
pub use lister::DirectoryLister;
pub use types::{FtpPhase, UploadError};

use crate::config::FtpConfig;
use std::io::Read;
use std::time::Duration;

/// 一条已登录、已切换到目标目录的 FTP 控制连接
pub trait FtpSession: Send {
    /// 列出当前目录（NLST），每行一个条目，保持服务器返回顺序
    fn list(&mut self) -> Result<Vec<String>, UploadError>;

    /// 以二进制方式把 `reader` 的内容写入 `remote_name`（STOR）
    fn store(&mut self, remote_name: &str, reader: &mut dyn Read) -> Result<(), UploadError>;

    /// 结束会话，失败时忽略
    fn quit(&mut self);
}

/// 按配置建立新连接
///
/// 每次调用返回独立的连接，批量上传时每个任务各自持有一条
pub trait FtpConnector: Send + Sync {
    fn connect(
        &self,
        config: &FtpConfig,
        timeout: Duration,
    ) -> Result<Box<dyn FtpSession>, UploadError>;
}
