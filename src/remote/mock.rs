// 测试用内存 FTP 服务器

use super::{FtpConnector, FtpSession, UploadError};
use crate::config::FtpConfig;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    listing: Vec<String>,
    stored: HashMap<String, Vec<u8>>,
    store_order: Vec<String>,
    reject_store: HashSet<String>,
}

/// 内存实现的连接器，克隆后共享同一份服务器状态
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<Mutex<MockState>>,
    fail_connect: Arc<AtomicBool>,
    fail_list: Arc<AtomicBool>,
    store_delay_ms: Arc<AtomicUsize>,
    connections: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl MockConnector {
    pub(crate) fn with_listing(entries: &[&str]) -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().listing = entries.iter().map(|s| s.to_string()).collect();
        mock
    }

    pub(crate) fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// 对指定远程文件名的 STOR 返回 553
    pub(crate) fn reject_store(&self, remote_name: &str) {
        self.state
            .lock()
            .unwrap()
            .reject_store
            .insert(remote_name.to_string());
    }

    /// 每次 STOR 前等待，用于观察并发连接数
    pub(crate) fn set_store_delay(&self, delay: Duration) {
        self.store_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub(crate) fn stored(&self, remote_name: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().stored.get(remote_name).cloned()
    }

    pub(crate) fn stored_names(&self) -> Vec<String> {
        self.state.lock().unwrap().store_order.clone()
    }

    pub(crate) fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl FtpConnector for MockConnector {
    fn connect(
        &self,
        _config: &FtpConfig,
        _timeout: Duration,
    ) -> Result<Box<dyn FtpSession>, UploadError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(UploadError::Connection("530 Login incorrect".to_string()));
        }

        self.connections.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            connector: self.clone(),
        }))
    }
}

struct MockSession {
    connector: MockConnector,
}

impl FtpSession for MockSession {
    fn list(&mut self) -> Result<Vec<String>, UploadError> {
        if self.connector.fail_list.load(Ordering::SeqCst) {
            return Err(UploadError::Protocol("550 Permission denied".to_string()));
        }
        Ok(self.connector.state.lock().unwrap().listing.clone())
    }

    fn store(&mut self, remote_name: &str, reader: &mut dyn Read) -> Result<(), UploadError> {
        let delay = self.connector.store_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay as u64));
        }

        if self
            .connector
            .state
            .lock()
            .unwrap()
            .reject_store
            .contains(remote_name)
        {
            return Err(UploadError::Protocol(format!(
                "553 Could not create file: {}",
                remote_name
            )));
        }

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| UploadError::Transfer(e.to_string()))?;

        let mut state = self.connector.state.lock().unwrap();
        state.stored.insert(remote_name.to_string(), data);
        state.store_order.push(remote_name.to_string());
        state.listing.push(remote_name.to_string());
        Ok(())
    }

    fn quit(&mut self) {}
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.connector.active.fetch_sub(1, Ordering::SeqCst);
    }
}
