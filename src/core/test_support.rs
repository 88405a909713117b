use crate::domain::model::{AuditOptions, AuditResult, CategoryScore};
use crate::domain::ports::{Auditor, Storage};
use crate::utils::error::{BatchError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    // 對這個路徑的 append 一律失敗
    broken_append: Option<String>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_broken_append(mut self, path: &str) -> Self {
        self.broken_append = Some(path.to_string());
        self
    }

    pub async fn put_file(&self, path: &str, data: &[u8]) {
        self.files.lock().await.insert(path.to_string(), data.to_vec());
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned()
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            BatchError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn append_file(&self, path: &str, data: &[u8]) -> Result<()> {
        if self.broken_append.as_deref() == Some(path) {
            return Err(BatchError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("Permission denied: {}", path),
            )));
        }
        let mut files = self.files.lock().await;
        files.entry(path.to_string()).or_default().extend_from_slice(data);
        Ok(())
    }
}

type Script = dyn Fn(usize, &str) -> Result<AuditResult> + Send + Sync;

/// 依呼叫序號（從 0 開始）與 URL 回傳預先寫好的結果
pub struct ScriptedAuditor {
    script: Box<Script>,
    counter: AtomicUsize,
    calls: std::sync::Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedAuditor {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &str) -> Result<AuditResult> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            counter: AtomicUsize::new(0),
            calls: std::sync::Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Auditor for ScriptedAuditor {
    async fn run_audit(&self, url: &str, options: &AuditOptions) -> Result<AuditResult> {
        let call = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(url.to_string());
        if let Some(delay) = self.delay {
            match options.timeout {
                Some(limit) if limit < delay => {
                    tokio::time::sleep(limit).await;
                    return Err(BatchError::TimeoutError {
                        url: url.to_string(),
                        seconds: limit.as_secs(),
                    });
                }
                _ => tokio::time::sleep(delay).await,
            }
        }
        (self.script)(call, url)
    }
}

pub fn category_result(performance: f64) -> AuditResult {
    AuditResult {
        categories: vec![CategoryScore {
            id: "performance".to_string(),
            title: "Performance".to_string(),
            score: Some(performance),
        }],
        ..AuditResult::default()
    }
}
