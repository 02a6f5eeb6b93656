// FTP 交互相关的错误类型

use std::path::PathBuf;
use thiserror::Error;

/// 上传过程中的错误分类
#[derive(Debug, Error)]
pub enum UploadError {
    /// 无法连接或登录服务器
    #[error("连接失败: {0}")]
    Connection(String),

    /// 服务器拒绝了列目录或上传命令
    #[error("服务器拒绝命令: {0}")]
    Protocol(String),

    /// 本地文件无法打开或读取
    #[error("本地文件读取失败: {path:?}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 数据传输过程中的错误
    #[error("传输失败: {0}")]
    Transfer(String),

    /// 路径中没有可用的文件名
    #[error("无效的本地路径: {0:?}")]
    InvalidPath(PathBuf),

    /// 批量上传中的任务异常退出
    #[error("上传任务异常: {0}")]
    TaskPanicked(String),
}

/// FTP 操作阶段，用于把底层错误映射到对应分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpPhase {
    /// 建立连接、登录、切换目录
    Connect,
    /// 列目录
    List,
    /// 上传数据
    Store,
}

impl UploadError {
    /// 按所处阶段转换 `ftp` crate 的错误
    pub fn from_ftp(phase: FtpPhase, err: ::ftp::FtpError) -> Self {
        use ::ftp::FtpError;

        let msg = err.to_string();
        match (phase, err) {
            (FtpPhase::Connect, _) => UploadError::Connection(msg),
            (_, FtpError::InvalidResponse(_)) => UploadError::Protocol(msg),
            (FtpPhase::List, _) => UploadError::Connection(msg),
            (FtpPhase::Store, _) => UploadError::Transfer(msg),
        }
    }

    /// 简短的分类名，用于日志和汇总
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Connection(_) => "connection",
            UploadError::Protocol(_) => "protocol",
            UploadError::LocalIo { .. } => "local_io",
            UploadError::Transfer(_) => "transfer",
            UploadError::InvalidPath(_) => "invalid_path",
            UploadError::TaskPanicked(_) => "task_panicked",
        }
    }
}
