use crate::core::reducer::ScoreMethod;
use crate::domain::model::{AuditOptions, AuditResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 批次設定來源，開始稽核前必須先通過驗證
pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn error_log_path(&self) -> &str;
    fn categories(&self) -> &[String];
    fn runs(&self) -> usize;
    fn score_method(&self) -> ScoreMethod;
    fn append_output(&self) -> bool;
    fn include_vitals(&self) -> bool;
    fn include_audits(&self) -> bool;
    fn metadata_header(&self) -> &str;
    fn chrome_flags(&self) -> Option<&str>;
    fn timeout_secs(&self) -> Option<u64>;

    fn metadata_headings(&self) -> Vec<String> {
        self.metadata_header()
            .split(',')
            .map(|heading| heading.trim().to_string())
            .collect()
    }

    fn audit_options(&self) -> AuditOptions {
        AuditOptions {
            categories: self.categories().to_vec(),
            chrome_flags: self.chrome_flags().map(str::to_string),
            timeout: self.timeout_secs().map(Duration::from_secs),
        }
    }
}

/// 對單一 URL 執行一次 Lighthouse。實作負責整個瀏覽器生命週期，
/// 回傳前瀏覽器必須已經關閉。
///
/// `options.timeout` 由實作自行處理：逾時要先停止並回收整個 session，
/// 再回傳 `BatchError::TimeoutError`。
#[async_trait]
pub trait Auditor: Send + Sync {
    async fn run_audit(&self, url: &str, options: &AuditOptions) -> Result<AuditResult>;
}
