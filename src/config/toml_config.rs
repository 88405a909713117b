use crate::config::{AuditorKind, PageSpeedStrategy, DEFAULT_CATEGORIES, DEFAULT_HEADER, DEFAULT_RUNS};
use crate::core::reducer::ScoreMethod;
use crate::core::ConfigProvider;
use crate::domain::model::KNOWN_CATEGORIES;
use crate::utils::error::{BatchError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub job: JobConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub auditor: AuditorConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub runs: Option<usize>,
    pub method: Option<ScoreMethod>,
    pub categories: Option<Vec<String>>,
    pub vitals: Option<bool>,
    pub audits: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    /// URL 前面那些欄位的標題
    pub header: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub error_log: Option<String>,
    pub append: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditorConfig {
    #[serde(default)]
    pub kind: AuditorKind,
    pub lighthouse_bin: Option<String>,
    pub chrome_flags: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub strategy: PageSpeedStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BatchError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BatchError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PAGESPEED_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BatchError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("job.name", &self.job.name)?;
        validation::validate_path("input.path", &self.input.path)?;
        validation::validate_path("output.path", &self.output.path)?;
        validation::validate_path("output.error_log", self.error_log_path())?;
        validation::validate_positive_number("job.runs", self.runs(), 1)?;
        validation::validate_choices("job.categories", self.categories(), &KNOWN_CATEGORIES)?;
        validation::validate_header("input.header", self.metadata_header())?;

        if let Some(timeout) = self.job.timeout_seconds {
            validation::validate_positive_number("job.timeout_seconds", timeout as usize, 1)?;
        }

        match self.auditor.kind {
            AuditorKind::Lighthouse => {
                if let Some(bin) = &self.auditor.lighthouse_bin {
                    validation::validate_non_empty_string("auditor.lighthouse_bin", bin)?;
                }
            }
            AuditorKind::Pagespeed => {
                if let Some(endpoint) = &self.auditor.endpoint {
                    validation::validate_url("auditor.endpoint", endpoint)?;
                }
            }
        }

        Ok(())
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn lighthouse_bin(&self) -> &str {
        self.auditor.lighthouse_bin.as_deref().unwrap_or("lighthouse")
    }
}

const DEFAULT_ERROR_LOG: &str = "lighthouse-errors.txt";

// 以 static 保存預設分類，讓 categories() 能回傳切片
static DEFAULT_CATEGORY_LIST: std::sync::LazyLock<Vec<String>> =
    std::sync::LazyLock::new(|| DEFAULT_CATEGORIES.map(String::from).to_vec());

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn error_log_path(&self) -> &str {
        self.output.error_log.as_deref().unwrap_or(DEFAULT_ERROR_LOG)
    }

    fn categories(&self) -> &[String] {
        self.job
            .categories
            .as_deref()
            .unwrap_or(DEFAULT_CATEGORY_LIST.as_slice())
    }

    fn runs(&self) -> usize {
        self.job.runs.unwrap_or(DEFAULT_RUNS)
    }

    fn score_method(&self) -> ScoreMethod {
        self.job.method.unwrap_or_default()
    }

    fn append_output(&self) -> bool {
        self.output.append.unwrap_or(false)
    }

    fn include_vitals(&self) -> bool {
        self.job.vitals.unwrap_or(false)
    }

    fn include_audits(&self) -> bool {
        self.job.audits.unwrap_or(false)
    }

    fn metadata_header(&self) -> &str {
        self.input.header.as_deref().unwrap_or(DEFAULT_HEADER)
    }

    fn chrome_flags(&self) -> Option<&str> {
        self.auditor.chrome_flags.as_deref()
    }

    fn timeout_secs(&self) -> Option<u64> {
        self.job.timeout_seconds
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[job]
name = "nightly"
runs = 5
method = "average"
categories = ["performance", "seo"]
vitals = true

[input]
path = "pages.csv"
header = "Name,Type,Team"

[output]
path = "results.csv"
append = true

[auditor]
kind = "lighthouse"
chrome_flags = "--headless=new"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.job.name, "nightly");
        assert_eq!(config.runs(), 5);
        assert_eq!(config.score_method(), ScoreMethod::Average);
        assert_eq!(config.categories(), ["performance", "seo"]);
        assert_eq!(config.metadata_headings().len(), 3);
        assert!(config.append_output());
        assert!(config.include_vitals());
        assert_eq!(config.chrome_flags(), Some("--headless=new"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_omitted() {
        let toml_content = r#"
[job]
name = "minimal"

[input]
path = "pages.csv"

[output]
path = "results.csv"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.runs(), 3);
        assert_eq!(config.score_method(), ScoreMethod::Median);
        assert_eq!(config.categories().len(), 4);
        assert_eq!(config.metadata_header(), "Name,Type");
        assert_eq!(config.error_log_path(), "lighthouse-errors.txt");
        assert_eq!(config.auditor.kind, AuditorKind::Lighthouse);
        assert_eq!(config.lighthouse_bin(), "lighthouse");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("LHB_TEST_API_KEY", "secret-key");

        let toml_content = r#"
[job]
name = "psi"

[input]
path = "pages.csv"

[output]
path = "results.csv"

[auditor]
kind = "pagespeed"
api_key = "${LHB_TEST_API_KEY}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.auditor.api_key.as_deref(), Some("secret-key"));
        assert_eq!(config.auditor.strategy, PageSpeedStrategy::Mobile);

        std::env::remove_var("LHB_TEST_API_KEY");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[job]
name = "bad"
runs = 0
categories = ["performance", "speed"]

[input]
path = "pages.csv"

[output]
path = "results.csv"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pagespeed_auditor_section() {
        let toml_content = r#"
[job]
name = "psi-desktop"
timeout_seconds = 120

[input]
path = "pages.csv"

[output]
path = "results.csv"

[auditor]
kind = "pagespeed"
strategy = "desktop"
endpoint = "https://psi.internal.example/v5/runPagespeed"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.auditor.kind, AuditorKind::Pagespeed);
        assert_eq!(config.auditor.strategy, PageSpeedStrategy::Desktop);
        assert_eq!(config.audit_options().timeout, Some(std::time::Duration::from_secs(120)));
        assert!(config.validate().is_ok());

        // 未知的 strategy 在解析時就失敗
        let invalid = toml_content.replace("\"desktop\"", "\"tablet\"");
        assert!(TomlConfig::from_toml_str(&invalid).is_err());
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let toml_content = r#"
[job]
name = "bad"
method = "mode"

[input]
path = "pages.csv"

[output]
path = "results.csv"
"#;

        assert!(TomlConfig::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[job]
name = "file-test"

[input]
path = "pages.csv"

[output]
path = "results.csv"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.job.name, "file-test");
    }
}
