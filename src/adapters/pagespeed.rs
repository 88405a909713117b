use crate::adapters::report::LighthouseReport;
use crate::config::PageSpeedStrategy;
use crate::domain::model::{AuditOptions, AuditResult};
use crate::domain::ports::Auditor;
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const PAGESPEED_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageSpeedResponse {
    lighthouse_result: Option<LighthouseReport>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<u16>,
    message: String,
}

/// 透過 PageSpeed Insights v5 API 遠端執行 Lighthouse
#[derive(Debug, Clone)]
pub struct PageSpeedApi {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    strategy: PageSpeedStrategy,
}

impl PageSpeedApi {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_endpoint(PAGESPEED_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key,
            strategy: PageSpeedStrategy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: PageSpeedStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn request_url(&self, url: &str, options: &AuditOptions) -> Result<Url> {
        let mut params = vec![
            ("url".to_string(), url.to_string()),
            ("strategy".to_string(), self.strategy.to_string()),
        ];
        // PSI 的分類參數是大寫底線格式，例如 BEST_PRACTICES
        for category in &options.categories {
            params.push((
                "category".to_string(),
                category.replace('-', "_").to_ascii_uppercase(),
            ));
        }
        if let Some(key) = &self.api_key {
            params.push(("key".to_string(), key.clone()));
        }

        Url::parse_with_params(&self.endpoint, &params).map_err(|e| BatchError::ConfigError {
            message: format!("invalid PageSpeed endpoint {}: {}", self.endpoint, e),
        })
    }
}

// 逾時要回報成 TimeoutError，其餘維持 ApiError
fn request_error(error: reqwest::Error, url: &str, timeout: Option<Duration>) -> BatchError {
    match timeout {
        Some(limit) if error.is_timeout() => BatchError::TimeoutError {
            url: url.to_string(),
            seconds: limit.as_secs(),
        },
        _ => BatchError::ApiError(error),
    }
}

#[async_trait]
impl Auditor for PageSpeedApi {
    async fn run_audit(&self, url: &str, options: &AuditOptions) -> Result<AuditResult> {
        if options.chrome_flags.is_some() {
            tracing::debug!("Chrome flags are ignored by the PageSpeed API");
        }

        let request_url = self.request_url(url, options)?;
        tracing::debug!("Requesting PageSpeed audit for {}", url);
        let mut request = self.client.get(request_url);
        if let Some(limit) = options.timeout {
            request = request.timeout(limit);
        }

        let response = request
            .send()
            .await
            .map_err(|e| request_error(e, url, options.timeout))?;
        let status = response.status();
        tracing::debug!("PageSpeed response status: {}", status);

        let body: PageSpeedResponse = response
            .json()
            .await
            .map_err(|e| request_error(e, url, options.timeout))?;

        if let Some(error) = body.error {
            return Err(BatchError::AuditError {
                url: url.to_string(),
                message: format!(
                    "PageSpeed API error {}: {}",
                    error.code.unwrap_or(status.as_u16()),
                    error.message
                ),
            });
        }

        match body.lighthouse_result {
            Some(report) if status.is_success() => Ok(report.into_audit_result(&options.categories)),
            _ => Err(BatchError::AuditError {
                url: url.to_string(),
                message: format!("PageSpeed API returned {} without a Lighthouse result", status),
            }),
        }
    }
}
