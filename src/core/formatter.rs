//! 把累積的樣本輸出成 CSV 摘要

use crate::core::accumulator::{Accumulator, PageAccumulator, Series};
use crate::core::reducer::ScoreMethod;
use crate::utils::error::{BatchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatOptions {
    pub method: ScoreMethod,
    pub include_vitals: bool,
    pub include_audits: bool,
}

/// 摘要的欄位配置。分類與指標欄位取自第一個有資料的頁面，
/// audit 欄位則收集所有頁面、依首次出現的順序排列。
/// 頁面缺少的欄位輸出空字串。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub metadata: Vec<String>,
    /// (分類 id, 標題)
    pub categories: Vec<(String, String)>,
    pub metrics: Vec<String>,
    /// (audit id, 標題)
    pub audits: Vec<(String, String)>,
}

impl Header {
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.metadata.clone();
        columns.extend(self.categories.iter().map(|(_, title)| title.clone()));
        columns.extend(self.metrics.iter().cloned());
        columns.extend(self.audits.iter().map(|(_, title)| title.clone()));
        columns
    }
}

pub fn derive_header(
    accumulator: &Accumulator,
    metadata_headings: &[String],
    options: &FormatOptions,
) -> Header {
    let mut header = Header {
        metadata: metadata_headings.to_vec(),
        ..Header::default()
    };

    let Some(page) = accumulator.pages().next() else {
        return header;
    };

    header.categories = page
        .scores
        .iter()
        .map(|series| (series.key.clone(), series.title.clone()))
        .collect();

    if options.include_vitals {
        header.metrics = page
            .metrics
            .iter()
            .flatten()
            .map(|series| series.key.clone())
            .collect();
    }

    // audit 會因頁面而異（例如只有部分頁面有圖片），所以取所有頁面的聯集
    if options.include_audits {
        for audit in accumulator.pages().filter_map(|page| page.audits.as_ref()).flatten() {
            if !header.audits.iter().any(|(id, _)| id == &audit.id) {
                header.audits.push((audit.id.clone(), audit.title.clone()));
            }
        }
    }

    header
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedOutput {
    pub csv: String,
    pub rows: usize,
    pub skipped_pages: Vec<usize>,
}

fn reduce_cell<T: Copy + Into<f64>>(series: Option<&Series<T>>, method: ScoreMethod) -> Result<String> {
    match series {
        Some(series) if !series.samples.is_empty() => {
            let samples: Vec<f64> = series.samples.iter().map(|&value| value.into()).collect();
            Ok(method.reduce(&samples)?.to_string())
        }
        _ => Ok(String::new()),
    }
}

fn page_record(page: &PageAccumulator, header: &Header, options: &FormatOptions) -> Result<Vec<String>> {
    let mut record = page.metadata.fields.clone();

    for (key, _) in &header.categories {
        record.push(reduce_cell(page.score(key), options.method)?);
    }

    for key in &header.metrics {
        record.push(reduce_cell(page.metric(key), options.method)?);
    }

    for (id, _) in &header.audits {
        record.push(page.audit(id).map(|audit| audit.score.to_string()).unwrap_or_default());
    }

    Ok(record)
}

/// 聚合每個頁面並序列化成 CSV。附加到既有檔案時 `write_header` 為 false
pub fn format_csv(
    accumulator: &Accumulator,
    metadata_headings: &[String],
    options: &FormatOptions,
    write_header: bool,
) -> Result<FormattedOutput> {
    let header = derive_header(accumulator, metadata_headings, options);
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    if write_header {
        writer.write_record(header.columns())?;
    }

    let mut rows = 0;
    let mut skipped_pages = Vec::new();
    for page in accumulator.pages() {
        if page.has_no_scores() {
            tracing::warn!(
                "⚠️ No usable samples for page {} ({}); row skipped",
                page.page_index + 1,
                page.metadata.url
            );
            skipped_pages.push(page.page_index);
            continue;
        }

        writer.write_record(page_record(page, &header, options)?)?;
        rows += 1;
    }

    let bytes = writer.into_inner().map_err(|e| BatchError::ProcessingError {
        message: format!("failed to flush CSV writer: {}", e),
    })?;
    let csv = String::from_utf8(bytes).map_err(|e| BatchError::ProcessingError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })?;

    Ok(FormattedOutput {
        csv,
        rows,
        skipped_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AuditScore, CategoryScore, PageRow};
    use std::collections::HashMap;

    fn headings() -> Vec<String> {
        vec!["Name".to_string(), "Type".to_string()]
    }

    fn row(name: &str) -> PageRow {
        PageRow {
            fields: vec![name.to_string(), "home".to_string()],
            url: format!("https://{}.example", name.to_lowercase()),
        }
    }

    fn category(id: &str, title: &str, score: f64) -> CategoryScore {
        CategoryScore {
            id: id.to_string(),
            title: title.to_string(),
            score: Some(score),
        }
    }

    #[test]
    fn test_csv_shape_with_average() {
        let mut acc = Accumulator::new();
        for (index, name) in ["A", "B"].iter().enumerate() {
            acc.record(index, &row(name), &[category("performance", "Performance", 0.5)], None, None);
            acc.record(index, &row(name), &[category("performance", "Performance", 0.6)], None, None);
        }

        let options = FormatOptions {
            method: ScoreMethod::Average,
            ..FormatOptions::default()
        };
        let output = format_csv(&acc, &headings(), &options, true).unwrap();
        let lines: Vec<&str> = output.csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Name,Type,Performance");
        assert_eq!(lines[1], "A,home,55");
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), headings().len() + 1);
        }
        assert_eq!(output.rows, 2);
    }

    #[test]
    fn test_median_keeps_fraction() {
        let mut acc = Accumulator::new();
        for score in [0.5, 0.6] {
            acc.record(0, &row("A"), &[category("seo", "SEO", score)], None, None);
        }

        let output = format_csv(&acc, &headings(), &FormatOptions::default(), true).unwrap();
        assert_eq!(output.csv.lines().nth(1), Some("A,home,55"));

        // 偶數個樣本的中位數保留小數

        acc.record(0, &row("A"), &[category("seo", "SEO", 0.71)], None, None);
        acc.record(0, &row("A"), &[category("seo", "SEO", 0.9)], None, None);
        let output = format_csv(&acc, &headings(), &FormatOptions::default(), true).unwrap();
        assert_eq!(output.csv.lines().nth(1), Some("A,home,65.5"));
    }

    #[test]
    fn test_page_without_samples_is_skipped() {
        let mut acc = Accumulator::new();
        acc.record(0, &row("A"), &[category("performance", "Performance", 0.5)], None, None);
        acc.record(1, &row("B"), &[category("performance", "Performance", 0.0)], None, None);

        let output = format_csv(&acc, &headings(), &FormatOptions::default(), true).unwrap();

        assert_eq!(output.csv, "Name,Type,Performance\nA,home,50\n");
        assert_eq!(output.skipped_pages, vec![1]);
    }

    #[test]
    fn test_vitals_and_audits_columns() {
        let mut acc = Accumulator::new();
        let mut metrics = HashMap::new();
        metrics.insert("largest-contentful-paint".to_string(), 1800.0);
        let audits = vec![AuditScore {
            id: "document-title".to_string(),
            title: "Document has a `<title>`, element".to_string(),
            score: Some(1.0),
        }];

        acc.record(
            0,
            &row("A"),
            &[category("performance", "Performance", 0.9)],
            Some(&metrics),
            Some(audits.as_slice()),
        );

        let options = FormatOptions {
            method: ScoreMethod::Median,
            include_vitals: true,
            include_audits: true,
        };
        let output = format_csv(&acc, &headings(), &options, true).unwrap();
        let lines: Vec<&str> = output.csv.lines().collect();

        // 含逗號的標題要加引號
        assert_eq!(
            lines[0],
            "Name,Type,Performance,largest-contentful-paint,\"Document has a `<title>`, element\""
        );
        assert_eq!(lines[1], "A,home,90,1800,1");
    }

    #[test]
    fn test_audit_columns_are_union_of_pages() {
        let mut acc = Accumulator::new();
        let audit = |id: &str, score: f64| AuditScore {
            id: id.to_string(),
            title: format!("{} title", id),
            score: Some(score),
        };
        let first = vec![audit("viewport", 1.0)];
        let second = vec![audit("image-alt", 0.0), audit("viewport", 0.0)];

        acc.record(0, &row("A"), &[category("seo", "SEO", 0.9)], None, Some(first.as_slice()));
        acc.record(1, &row("B"), &[category("seo", "SEO", 0.8)], None, Some(second.as_slice()));

        let options = FormatOptions {
            include_audits: true,
            ..FormatOptions::default()
        };
        let output = format_csv(&acc, &headings(), &options, true).unwrap();
        let lines: Vec<&str> = output.csv.lines().collect();

        // 只有 B 回報的 image-alt 也要有欄位，A 該格留空
        assert_eq!(lines[0], "Name,Type,SEO,viewport title,image-alt title");
        assert_eq!(lines[1], "A,home,90,1,");
        assert_eq!(lines[2], "B,home,80,0,0");
    }

    #[test]
    fn test_missing_metric_is_empty_cell() {
        let mut acc = Accumulator::new();
        let mut first = HashMap::new();
        first.insert("speed-index".to_string(), 1200.0);
        acc.record(0, &row("A"), &[category("performance", "Performance", 0.9)], Some(&first), None);
        acc.record(1, &row("B"), &[category("performance", "Performance", 0.8)], Some(&HashMap::new()), None);

        let options = FormatOptions {
            include_vitals: true,
            ..FormatOptions::default()
        };
        let output = format_csv(&acc, &headings(), &options, true).unwrap();

        // B 沒有 speed-index，輸出空字串
        assert_eq!(output.csv.lines().nth(2), Some("B,home,80,"));
    }

    #[test]
    fn test_no_header_when_appending() {
        let mut acc = Accumulator::new();
        acc.record(0, &row("A"), &[category("performance", "Performance", 0.42)], None, None);

        let output = format_csv(&acc, &headings(), &FormatOptions::default(), false).unwrap();
        assert_eq!(output.csv, "A,home,42\n");
    }

    #[test]
    fn test_empty_accumulator_has_metadata_header() {
        let output = format_csv(&Accumulator::new(), &headings(), &FormatOptions::default(), true).unwrap();
        assert_eq!(output.csv, "Name,Type\n");
        assert_eq!(output.rows, 0);
    }
}
