// Net File Uploader
// FTP 文件上传库：处理远程文件名冲突后，单个或批量上传本地文件

// 配置管理模块
pub mod config;

// 日志模块
pub mod logging;

// FTP 远程访问模块
pub mod remote;

// 上传模块
pub mod uploader;

// 导出常用类型
pub use config::{AppConfig, FreshNamePolicy, FtpConfig, LogConfig, UploadConfig};
pub use remote::{DirectoryLister, FtpConnector, FtpSession, StdFtpConnector, UploadError};
pub use uploader::{
    BatchReport, BatchStatus, NameResolver, RemoteNamer, UploadEngine, UploadManager, UploadTask,
    UploadTaskStatus,
};
