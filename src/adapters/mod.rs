// Adapters 層：`Auditor` port 的具體實作

pub mod lighthouse_cli;
pub mod pagespeed;
pub mod report;

use crate::config::{AuditorKind, PageSpeedStrategy};
use crate::domain::model::{AuditOptions, AuditResult};
use crate::domain::ports::Auditor;
use crate::utils::error::Result;
use async_trait::async_trait;
use lighthouse_cli::LighthouseCli;
use pagespeed::PageSpeedApi;

/// 啟動時依設定選出的 auditor
#[derive(Debug, Clone)]
pub enum AnyAuditor {
    Lighthouse(LighthouseCli),
    PageSpeed(PageSpeedApi),
}

#[async_trait]
impl Auditor for AnyAuditor {
    async fn run_audit(&self, url: &str, options: &AuditOptions) -> Result<AuditResult> {
        match self {
            AnyAuditor::Lighthouse(cli) => cli.run_audit(url, options).await,
            AnyAuditor::PageSpeed(api) => api.run_audit(url, options).await,
        }
    }
}

/// 建立 auditor 所需的設定
#[derive(Debug, Clone, Default)]
pub struct AuditorSettings<'a> {
    pub lighthouse_bin: &'a str,
    pub api_key: Option<String>,
    pub endpoint: Option<&'a str>,
    pub strategy: PageSpeedStrategy,
}

impl AnyAuditor {
    pub fn from_kind(kind: AuditorKind, settings: AuditorSettings<'_>) -> Self {
        match kind {
            AuditorKind::Lighthouse => AnyAuditor::Lighthouse(LighthouseCli::new(settings.lighthouse_bin)),
            AuditorKind::Pagespeed => {
                let api = match settings.endpoint {
                    Some(endpoint) => PageSpeedApi::with_endpoint(endpoint, settings.api_key),
                    None => PageSpeedApi::new(settings.api_key),
                };
                AnyAuditor::PageSpeed(api.with_strategy(settings.strategy))
            }
        }
    }
}
