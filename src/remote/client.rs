// 基于 `ftp` crate 的连接实现

use super::{FtpConnector, FtpPhase, FtpSession, UploadError};
use crate::config::FtpConfig;
use ::ftp::types::FileType;
use ::ftp::FtpStream;
use std::io::Read;
use std::time::Duration;
use tracing::{debug, warn};

/// 默认连接器：每次 connect 建立一条新的 FTP 控制连接
///
/// 数据连接使用被动模式（`ftp` crate 固定使用 PASV），不启用 TLS
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFtpConnector;

impl FtpConnector for StdFtpConnector {
    fn connect(
        &self,
        config: &FtpConfig,
        timeout: Duration,
    ) -> Result<Box<dyn FtpSession>, UploadError> {
        let addr = config.socket_addr();
        debug!("连接 FTP 服务器: {}", addr);

        let mut stream = FtpStream::connect(addr.as_str())
            .map_err(|e| UploadError::from_ftp(FtpPhase::Connect, e))?;

        // 只作用于控制连接；`put` 内部建立的 PASV 数据连接没有超时
        let tcp = stream.get_ref();
        tcp.set_read_timeout(Some(timeout))
            .and_then(|_| tcp.set_write_timeout(Some(timeout)))
            .map_err(|e| UploadError::Connection(format!("设置超时失败: {}", e)))?;

        stream
            .login(config.login_user(), &config.password)
            .map_err(|e| UploadError::from_ftp(FtpPhase::Connect, e))?;

        let dir = config.remote_dir();
        if !dir.is_empty() {
            stream
                .cwd(&dir)
                .map_err(|e| UploadError::from_ftp(FtpPhase::Connect, e))?;
        }

        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| UploadError::from_ftp(FtpPhase::Connect, e))?;

        debug!("FTP 登录成功: {}@{}", config.login_user(), addr);
        Ok(Box::new(StdFtpSession { stream }))
    }
}

/// `FtpStream` 的会话包装
struct StdFtpSession {
    stream: FtpStream,
}

impl FtpSession for StdFtpSession {
    fn list(&mut self) -> Result<Vec<String>, UploadError> {
        self.stream
            .nlst(None)
            .map_err(|e| UploadError::from_ftp(FtpPhase::List, e))
    }

    fn store(&mut self, remote_name: &str, reader: &mut dyn Read) -> Result<(), UploadError> {
        let mut reader = reader;
        self.stream
            .put(remote_name, &mut reader)
            .map_err(|e| UploadError::from_ftp(FtpPhase::Store, e))
    }

    fn quit(&mut self) {
        if let Err(e) = self.stream.quit() {
            warn!("关闭 FTP 连接失败: {}", e);
        }
    }
}
