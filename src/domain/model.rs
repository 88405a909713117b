use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// `--categories` 可接受的 Lighthouse 分類 id
pub const KNOWN_CATEGORIES: [&str; 5] = ["performance", "accessibility", "best-practices", "seo", "pwa"];

/// 以 `numericValue` 收集為原始指標的 audit
pub const VITAL_METRICS: [&str; 7] = [
    "first-contentful-paint",
    "largest-contentful-paint",
    "total-blocking-time",
    "cumulative-layout-shift",
    "speed-index",
    "interactive",
    "server-response-time",
];

/// 輸入清單的一行：metadata 欄位加上最後的 URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRow {
    pub fields: Vec<String>,
    pub url: String,
}

impl PageRow {
    /// 先切出 `metadata_count` 個欄位，剩下的整段都是 URL（可含逗號）
    pub fn parse_line(line: &str, metadata_count: usize) -> Option<Self> {
        let mut parts = line.splitn(metadata_count + 1, ',');
        let fields: Vec<String> = parts
            .by_ref()
            .take(metadata_count)
            .map(|field| field.trim().to_string())
            .collect();
        let url = parts.next()?.trim().to_string();

        if fields.len() < metadata_count || url.is_empty() {
            return None;
        }

        Some(Self { fields, url })
    }

    /// 解析整份清單，略過空白行
    pub fn parse_list(content: &str, metadata_count: usize) -> Result<Vec<Self>> {
        let mut rows = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let row = Self::parse_line(line, metadata_count).ok_or_else(|| BatchError::InputError {
                line: index + 1,
                message: format!(
                    "expected {} metadata field(s) followed by a URL, got '{}'",
                    metadata_count, line
                ),
            })?;
            rows.push(row);
        }

        Ok(rows)
    }
}

/// 除了 URL 之外 auditor 需要的參數
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOptions {
    pub categories: Vec<String>,
    pub chrome_flags: Option<String>,
    /// 單次稽核的上限，包含瀏覽器關閉
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub id: String,
    pub title: String,
    /// 原始分數 [0, 1]；Lighthouse 無法評分時為 `None`
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditScore {
    pub id: String,
    pub title: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeError {
    pub code: String,
    pub message: String,
}

/// 從一份 Lighthouse 報告取出的數值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditResult {
    pub categories: Vec<CategoryScore>,
    pub metrics: HashMap<String, f64>,
    pub audits: Vec<AuditScore>,
    pub runtime_error: Option<RuntimeError>,
}

impl AuditResult {
    pub fn failed(&self) -> bool {
        self.runtime_error.is_some()
    }
}

/// Converts a raw [0, 1] category score to the 0-100 integer scale.
pub fn to_percent(score: f64) -> u32 {
    (score * 100.0).round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_keeps_commas_in_url() {
        let row = PageRow::parse_line("Home,landing,https://a.example/?q=1,2", 2).unwrap();
        assert_eq!(row.fields, vec!["Home", "landing"]);
        assert_eq!(row.url, "https://a.example/?q=1,2");
    }

    #[test]
    fn test_parse_line_without_url() {
        assert!(PageRow::parse_line("Home,landing", 2).is_none());
        assert!(PageRow::parse_line("Home,landing,  ", 2).is_none());
    }

    #[test]
    fn test_parse_list_skips_blank_lines() {
        let content = "A,home,https://a.example\n\r\nB,blog,https://b.example\r\n";
        let rows = PageRow::parse_list(content, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].url, "https://b.example");
    }

    #[test]
    fn test_parse_list_reports_line_number() {
        let content = "A,home,https://a.example\nbroken";
        match PageRow::parse_list(content, 2) {
            Err(BatchError::InputError { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected input error, got {:?}", other),
        }
    }

    #[test]
    fn test_to_percent() {
        assert_eq!(to_percent(0.5), 50);
        assert_eq!(to_percent(0.996), 100);
        assert_eq!(to_percent(0.004), 0);
    }
}
