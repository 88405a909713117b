//! 批次會讀取的 Lighthouse JSON 報告（LHR）欄位

use crate::domain::model::{AuditResult, AuditScore, CategoryScore, RuntimeError, KNOWN_CATEGORIES, VITAL_METRICS};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseReport {
    #[serde(default)]
    pub categories: HashMap<String, ReportCategory>,
    #[serde(default)]
    pub audits: BTreeMap<String, ReportAudit>,
    pub runtime_error: Option<ReportRuntimeError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportCategory {
    pub id: String,
    pub title: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAudit {
    pub id: String,
    pub title: String,
    pub score: Option<f64>,
    pub numeric_value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRuntimeError {
    pub code: String,
    pub message: String,
}

impl LighthouseReport {
    /// 分類依指定順序輸出；沒指定時依 Lighthouse 本身的順序
    pub fn into_audit_result(self, requested: &[String]) -> AuditResult {
        let order: Vec<&str> = if requested.is_empty() {
            KNOWN_CATEGORIES.to_vec()
        } else {
            requested.iter().map(String::as_str).collect()
        };

        let mut categories_by_id = self.categories;
        let categories = order
            .iter()
            .filter_map(|id| categories_by_id.remove(*id))
            .map(|category| CategoryScore {
                id: category.id,
                title: category.title,
                score: category.score,
            })
            .collect();

        let metrics = VITAL_METRICS
            .iter()
            .filter_map(|id| {
                self.audits
                    .get(*id)
                    .and_then(|audit| audit.numeric_value)
                    .filter(|value| value.is_finite())
                    .map(|value| (id.to_string(), value))
            })
            .collect();

        let audits = self
            .audits
            .into_values()
            .map(|audit| AuditScore {
                id: audit.id,
                title: audit.title,
                score: audit.score,
            })
            .collect();

        let runtime_error = self.runtime_error.map(|error| RuntimeError {
            code: error.code,
            message: error.message,
        });

        AuditResult {
            categories,
            metrics,
            audits,
            runtime_error,
        }
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_REPORT: &str = r#"{
  "lighthouseVersion": "12.2.1",
  "requestedUrl": "https://a.example/",
  "categories": {
    "seo": {"id": "seo", "title": "SEO", "score": 0.91},
    "performance": {"id": "performance", "title": "Performance", "score": 0.87}
  },
  "audits": {
    "largest-contentful-paint": {
      "id": "largest-contentful-paint",
      "title": "Largest Contentful Paint",
      "score": 0.8,
      "numericValue": 2450.25
    },
    "cumulative-layout-shift": {
      "id": "cumulative-layout-shift",
      "title": "Cumulative Layout Shift",
      "score": 1,
      "numericValue": 0.02
    },
    "document-title": {
      "id": "document-title",
      "title": "Document has a `<title>` element",
      "score": 1
    },
    "screenshot-thumbnails": {
      "id": "screenshot-thumbnails",
      "title": "Screenshot Thumbnails",
      "score": null
    }
  }
}"#;
