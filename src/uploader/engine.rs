// 上传引擎
//
// 负责单个文件的传输：
// 1. 打开本地文件
// 2. 新建一条 FTP 连接（被动模式、二进制、上传后立即关闭）
// 3. 按固定缓冲区大小分块写出，每块记录累计字节数
//
// 失败时直接返回错误，不重试，也不回滚已写入的数据

use crate::config::{FtpConfig, UploadConfig};
use crate::remote::{FtpConnector, UploadError};
use crate::uploader::UploadTask;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 实际使用的分块大小：文件长度与缓冲区大小取较小值，缓冲区至少 1 字节
pub fn effective_chunk_size(file_size: u64, buffer_size: usize) -> usize {
    file_size.min(buffer_size.max(1) as u64) as usize
}

/// 分块读取并记录进度的 Reader
///
/// 每次最多读出 `chunk_size` 字节；本地读取错误会被记录下来，
/// 以便和网络写入错误区分
pub struct ProgressReader<R> {
    inner: R,
    chunk_size: usize,
    total_size: u64,
    written: u64,
    label: String,
    local_error: Option<io::Error>,
}

impl<R: Read> ProgressReader<R> {
    pub fn new(inner: R, chunk_size: usize, total_size: u64, label: impl Into<String>) -> Self {
        Self {
            inner,
            chunk_size,
            total_size,
            written: 0,
            label: label.into(),
            local_error: None,
        }
    }

    /// 已交给连接写出的字节数
    pub fn written(&self) -> u64 {
        self.written
    }

    /// 取出读取本地文件时发生的错误
    pub fn take_local_error(&mut self) -> Option<io::Error> {
        self.local_error.take()
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let limit = buf.len().min(self.chunk_size);
        if limit == 0 {
            return Ok(0);
        }

        match self.inner.read(&mut buf[..limit]) {
            Ok(n) => {
                if n > 0 {
                    self.written += n as u64;
                    debug!(
                        "[{}] 已写入 {} / {} 字节",
                        self.label, self.written, self.total_size
                    );
                }
                Ok(n)
            }
            Err(e) => {
                let kind = e.kind();
                let msg = e.to_string();
                self.local_error = Some(e);
                Err(io::Error::new(kind, msg))
            }
        }
    }
}

/// 单文件上传引擎
#[derive(Clone)]
pub struct UploadEngine {
    connector: Arc<dyn FtpConnector>,
    config: Arc<FtpConfig>,
    upload: UploadConfig,
}

impl UploadEngine {
    pub fn new(connector: Arc<dyn FtpConnector>, config: Arc<FtpConfig>, upload: UploadConfig) -> Self {
        let mut upload = upload;
        if upload.chunk_size == 0 {
            warn!("chunk_size 为 0，改用 1 字节");
            upload.chunk_size = 1;
        }
        Self {
            connector,
            config,
            upload,
        }
    }

    /// 上传 `task.local_path` 到 `task.remote_name`
    ///
    /// 阻塞直到传输结束，任务状态随结果更新
    pub fn upload(&self, task: &mut UploadTask) -> Result<(), UploadError> {
        let result = self.transfer(task);
        match &result {
            Ok(()) => {
                task.mark_completed();
                info!(
                    "文件上传完成: {} -> {} ({} 字节)",
                    task.local_path.display(),
                    task.remote_name,
                    task.total_size
                );
            }
            Err(e) => {
                error!(
                    "文件上传失败: {} -> {}: {}",
                    task.local_path.display(),
                    task.remote_name,
                    e
                );
                task.mark_failed(e.to_string());
            }
        }
        result
    }

    fn transfer(&self, task: &mut UploadTask) -> Result<(), UploadError> {
        let (file, total_size) = open_local(&task.local_path)?;
        self.transfer_from(task, file, total_size)
    }

    /// 把已打开的本地数据写到远程，写出字节数少于 `total_size` 视为失败
    fn transfer_from<R: Read>(
        &self,
        task: &mut UploadTask,
        source: R,
        total_size: u64,
    ) -> Result<(), UploadError> {
        task.mark_uploading(total_size);

        let mut session = self.connector.connect(&self.config, self.upload.timeout())?;

        let chunk_size = effective_chunk_size(total_size, self.upload.chunk_size);
        info!(
            "开始上传文件: {} (大小: {} 字节, 分块: {} 字节)",
            task.remote_name, total_size, chunk_size
        );

        let mut reader = ProgressReader::new(source, chunk_size, total_size, task.remote_name.clone());
        let result = session.store(&task.remote_name, &mut reader);
        session.quit();

        task.uploaded_size = reader.written();

        match result {
            Ok(()) if task.uploaded_size < total_size => Err(UploadError::Transfer(format!(
                "只写入了 {} / {} 字节",
                task.uploaded_size, total_size
            ))),
            Ok(()) => Ok(()),
            Err(e) => match reader.take_local_error() {
                Some(source) => Err(UploadError::LocalIo {
                    path: task.local_path.clone(),
                    source,
                }),
                None => Err(e),
            },
        }
    }
}

fn open_local(path: &Path) -> Result<(File, u64), UploadError> {
    let local_io = |source: io::Error| UploadError::LocalIo {
        path: PathBuf::from(path),
        source,
    };

    let file = File::open(path).map_err(local_io)?;
    let metadata = file.metadata().map_err(local_io)?;
    if metadata.is_dir() {
        return Err(local_io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "是目录而不是文件",
        )));
    }
    Ok((file, metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::MockConnector;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn engine_for(mock: &MockConnector, chunk_size: usize) -> UploadEngine {
        let upload = UploadConfig {
            chunk_size,
            ..UploadConfig::default()
        };
        UploadEngine::new(
            Arc::new(mock.clone()),
            Arc::new(FtpConfig::new("ftp://mock/", "/upload/", "user", "pw")),
            upload,
        )
    }

    /// 每次只返回一个字节后报错的 Reader
    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::Other, "disk read error"));
            }
            self.sent = true;
            buf[0] = b'x';
            Ok(1)
        }
    }

    #[test]
    fn test_effective_chunk_size() {
        assert_eq!(effective_chunk_size(100, 2048), 100);
        assert_eq!(effective_chunk_size(10_000, 2048), 2048);
        assert_eq!(effective_chunk_size(0, 2048), 0);
        assert_eq!(effective_chunk_size(5000, 0), 1);
    }

    #[test]
    fn test_zero_chunk_size_still_uploads_whole_file() {
        let mock = MockConnector::with_listing(&[]);
        let engine = engine_for(&mock, 0);

        let mut temp_file = NamedTempFile::new().unwrap();
        let content = vec![3u8; 5000];
        temp_file.write_all(&content).unwrap();
        temp_file.flush().unwrap();

        let mut task = UploadTask::new(temp_file.path().to_path_buf(), "zero.bin".to_string());
        engine.upload(&mut task).unwrap();

        assert!(task.is_completed());
        assert_eq!(task.uploaded_size, 5000);
        assert_eq!(mock.stored("zero.bin"), Some(content));
    }

    #[test]
    fn test_short_write_is_transfer_error() {
        // 本地文件在打开后被截断：记录大小 4096，实际只能读出 100 字节
        let mock = MockConnector::with_listing(&[]);
        let engine = engine_for(&mock, 2048);

        let mut task = UploadTask::new(PathBuf::from("short.bin"), "short.bin".to_string());
        let err = engine
            .transfer_from(&mut task, Cursor::new(vec![1u8; 100]), 4096)
            .unwrap_err();

        assert!(matches!(err, UploadError::Transfer(_)));
        assert_eq!(task.uploaded_size, 100);
        assert_eq!(task.total_size, 4096);
    }

    #[test]
    fn test_progress_reader_limits_chunk() {
        let data = vec![7u8; 5000];
        let mut reader = ProgressReader::new(Cursor::new(data), 2048, 5000, "test");

        let mut buf = [0u8; 8192];
        assert_eq!(reader.read(&mut buf).unwrap(), 2048);
        assert_eq!(reader.read(&mut buf).unwrap(), 2048);
        assert_eq!(reader.read(&mut buf).unwrap(), 904);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert_eq!(reader.written(), 5000);
    }

    #[test]
    fn test_progress_reader_records_local_error() {
        let mut reader = ProgressReader::new(FailingReader { sent: false }, 16, 2, "test");
        let mut sink = Vec::new();

        assert!(io::copy(&mut reader, &mut sink).is_err());
        assert_eq!(reader.written(), 1);
        assert!(reader.take_local_error().is_some());
    }

    #[test]
    fn test_upload_stores_file_content() {
        let mock = MockConnector::with_listing(&[]);
        let engine = engine_for(&mock, 2048);

        let mut temp_file = NamedTempFile::new().unwrap();
        let content: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        temp_file.write_all(&content).unwrap();
        temp_file.flush().unwrap();

        let mut task = UploadTask::new(temp_file.path().to_path_buf(), "data.bin".to_string());
        engine.upload(&mut task).unwrap();

        assert!(task.is_completed());
        assert_eq!(task.total_size, 5000);
        assert_eq!(task.uploaded_size, 5000);
        assert_eq!(mock.stored("data.bin"), Some(content));
    }

    #[test]
    fn test_upload_empty_file() {
        let mock = MockConnector::with_listing(&[]);
        let engine = engine_for(&mock, 2048);
        let temp_file = NamedTempFile::new().unwrap();

        let mut task = UploadTask::new(temp_file.path().to_path_buf(), "empty.txt".to_string());
        engine.upload(&mut task).unwrap();

        assert!(task.is_completed());
        assert_eq!(mock.stored("empty.txt"), Some(Vec::new()));
    }

    #[test]
    fn test_upload_missing_local_file() {
        let mock = MockConnector::with_listing(&[]);
        let engine = engine_for(&mock, 2048);

        let mut task = UploadTask::new(
            PathBuf::from("/nonexistent/file.txt"),
            "file.txt".to_string(),
        );
        let err = engine.upload(&mut task).unwrap_err();

        assert!(matches!(err, UploadError::LocalIo { .. }));
        assert!(task.is_failed());
        assert_eq!(mock.connection_count(), 0);
    }

    #[test]
    fn test_upload_rejected_by_server() {
        let mock = MockConnector::with_listing(&[]);
        mock.reject_store("denied.txt");
        let engine = engine_for(&mock, 2048);

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"content").unwrap();
        temp_file.flush().unwrap();

        let mut task = UploadTask::new(temp_file.path().to_path_buf(), "denied.txt".to_string());
        let err = engine.upload(&mut task).unwrap_err();

        assert!(matches!(err, UploadError::Protocol(_)));
        assert!(task.is_failed());
        assert!(task.error.as_deref().unwrap_or_default().contains("553"));
    }

    #[test]
    fn test_upload_connection_failure() {
        let mock = MockConnector::with_listing(&[]);
        mock.fail_connect(true);
        let engine = engine_for(&mock, 2048);

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"content").unwrap();
        temp_file.flush().unwrap();

        let mut task = UploadTask::new(temp_file.path().to_path_buf(), "file.txt".to_string());
        let err = engine.upload(&mut task).unwrap_err();
        assert!(matches!(err, UploadError::Connection(_)));
    }
}
