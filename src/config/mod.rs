// 配置管理模块

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// FTP 默认端口
pub const DEFAULT_FTP_PORT: u16 = 21;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// FTP 连接配置
    #[serde(default)]
    pub ftp: FtpConfig,
    /// 上传配置
    #[serde(default)]
    pub upload: UploadConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// FTP 连接配置
///
/// 每个上传器实例绑定一组服务器地址、目标目录和凭证，创建后不再修改
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct FtpConfig {
    /// 服务器地址，支持 `ftp://host[:port]/` 或 `host[:port]`
    #[serde(default)]
    pub address: String,
    /// 远程目标目录（为空时使用登录后的默认目录）
    #[serde(default)]
    pub destination_path: String,
    /// 用户名（为空时使用 anonymous）
    #[serde(default)]
    pub username: String,
    /// 密码
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpConfig")
            .field("address", &self.address)
            .field("destination_path", &self.destination_path)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl FtpConfig {
    pub fn new(
        address: impl Into<String>,
        destination_path: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            destination_path: destination_path.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// 规范化为 `host:port` 形式的连接地址
    ///
    /// - `ftp://example.com/` -> `example.com:21`
    /// - `example.com:2121` -> `example.com:2121`
    pub fn socket_addr(&self) -> String {
        let host_port = self.address_parts().0;

        let has_port = match host_port.rsplit_once(':') {
            Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
            None => false,
        };

        if has_port {
            host_port.to_string()
        } else {
            format!("{}:{}", host_port, DEFAULT_FTP_PORT)
        }
    }

    /// 登录后要进入的远程目录：地址中的路径与 `destination_path` 拼接
    ///
    /// - `ftp://example.com/` + `/upload/` -> `/upload/`
    /// - `ftp://example.com/pub/` + `uploads/` -> `/pub/uploads/`
    /// - `ftp://example.com/pub` + `` -> `/pub`
    ///
    /// 返回空字符串表示停留在登录目录
    pub fn remote_dir(&self) -> String {
        let base = self.address_parts().1;
        let dest = self.destination_path.trim();

        if base.is_empty() || base == "/" {
            return dest.to_string();
        }
        if dest.is_empty() {
            return base.to_string();
        }
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            dest.trim_start_matches('/')
        )
    }

    /// 拆分地址为 (`host[:port]`, 路径)，路径保留开头的 `/`
    fn address_parts(&self) -> (&str, &str) {
        let trimmed = self.address.trim();
        let without_scheme = trimmed
            .strip_prefix("ftp://")
            .or_else(|| trimmed.strip_prefix("FTP://"))
            .unwrap_or(trimmed);
        match without_scheme.find('/') {
            Some(idx) => without_scheme.split_at(idx),
            None => (without_scheme, ""),
        }
    }

    /// 登录用户名，未配置时回退为匿名登录
    pub fn login_user(&self) -> &str {
        if self.username.is_empty() {
            "anonymous"
        } else {
            &self.username
        }
    }
}

/// 无冲突时远程文件名的取法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshNamePolicy {
    /// 只使用本地文件名（与加后缀分支保持一致）
    #[default]
    FileName,
    /// 原样使用本地路径字符串
    LocalPath,
}

/// 上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 批量上传时最大同时连接数
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    /// 每次写入的缓冲区大小（字节）
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// 控制连接读写超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 无冲突时的远程文件名策略
    #[serde(default)]
    pub fresh_name: FreshNamePolicy,
}

fn default_max_concurrent_tasks() -> usize {
    5
}

fn default_chunk_size() -> usize {
    2048
}

fn default_timeout_secs() -> u64 {
    10_000
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            chunk_size: default_chunk_size(),
            timeout_secs: default_timeout_secs(),
            fresh_name: FreshNamePolicy::default(),
        }
    }
}

impl UploadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 是否写入日志文件
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,
    /// 日志文件目录
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// 日志保留天数（默认 7 天）
    #[serde(default = "default_log_retention_days")]
    pub retention_days: u32,
    /// 日志级别（默认 info）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 单个日志文件最大大小（字节，默认 10MB）
    #[serde(default = "default_log_max_file_size")]
    pub max_file_size: u64,
}

fn default_log_enabled() -> bool {
    false
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_retention_days() -> u32 {
    7
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            log_dir: default_log_dir(),
            retention_days: default_log_retention_days(),
            level: default_log_level(),
            max_file_size: default_log_max_file_size(),
        }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub async fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("读取配置文件失败: {}", path))?;

        let config: AppConfig = toml::from_str(&content).context("解析配置文件失败")?;
        Ok(config)
    }

    /// 加载配置，失败时使用默认配置，并把失败原因交给调用方
    ///
    /// 不在这里写日志：调用时日志系统通常还未初始化
    pub async fn load_or_default(path: &str) -> (Self, Option<anyhow::Error>) {
        match Self::load_from_file(path).await {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// 检查配置是否可用于上传
    pub fn validate(&self) -> Result<()> {
        if self.ftp.address.trim().is_empty() {
            anyhow::bail!("未配置 FTP 服务器地址");
        }
        if self.upload.max_concurrent_tasks == 0 {
            anyhow::bail!("max_concurrent_tasks 必须大于 0");
        }
        if self.upload.chunk_size == 0 {
            anyhow::bail!("chunk_size 必须大于 0");
        }
        if self.upload.timeout_secs == 0 {
            anyhow::bail!("timeout_secs 必须大于 0");
        }
        Ok(())
    }
}
