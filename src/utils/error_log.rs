use crate::domain::ports::Storage;
use crate::utils::error::Result;

/// 批次中所有可恢復錯誤的編號紀錄，只會附加。
/// 同一個計數器也用在終端輸出與最後的摘要。
pub struct ErrorLog<'a, S: Storage> {
    storage: &'a S,
    path: String,
    count: usize,
}

impl<'a, S: Storage> ErrorLog<'a, S> {
    pub fn new(storage: &'a S, path: impl Into<String>) -> Self {
        Self {
            storage,
            path: path.into(),
            count: 0,
        }
    }

    /// 清空紀錄檔，在第一次稽核前呼叫
    pub async fn reset(&self) -> Result<()> {
        self.storage.write_file(&self.path, b"").await
    }

    pub async fn record(&mut self, context: &str, message: &str) -> usize {
        self.count += 1;
        tracing::error!("❌ Error {}: {} - {}", self.count, context, message);

        let entry = format!(
            "Error {} [{}]: {}\n{}\n\n",
            self.count,
            chrono::Utc::now().to_rfc3339(),
            context,
            message
        );
        if let Err(e) = self.storage.append_file(&self.path, entry.as_bytes()).await {
            tracing::warn!("⚠️ Could not append to error log {}: {}", self.path, e);
        }

        self.count
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::MockStorage;

    #[tokio::test]
    async fn test_entries_are_numbered() {
        let storage = MockStorage::new();
        let mut log = ErrorLog::new(&storage, "errors.txt");
        log.reset().await.unwrap();

        assert_eq!(log.record("run 1/2, page 1/1 (https://a.example)", "boom").await, 1);
        assert_eq!(log.record("run 2/2, page 1/1 (https://a.example)", "boom").await, 2);

        let text = String::from_utf8(storage.get_file("errors.txt").await.unwrap()).unwrap();
        assert!(text.starts_with("Error 1 ["));
        assert!(text.contains("]: run 2/2, page 1/1 (https://a.example)\nboom\n\n"));
    }

    #[tokio::test]
    async fn test_failed_append_still_counts() {
        let storage = MockStorage::new().with_broken_append("errors.txt");
        let mut log = ErrorLog::new(&storage, "errors.txt");

        // 寫入失敗只記警告，計數照樣增加
        assert_eq!(log.record("run 1/1, page 1/1", "chrome crashed").await, 1);
        assert_eq!(log.record("run 1/1, page 1/1", "chrome crashed").await, 2);
        assert_eq!(log.count(), 2);
        assert!(storage.get_file("errors.txt").await.is_none());
    }
}
