use crate::core::formatter::{format_csv, FormatOptions};
use crate::core::run_loop::{RunLoop, RunSettings};
use crate::domain::model::PageRow;
use crate::domain::ports::{Auditor, ConfigProvider, Storage};
use crate::utils::error::{BatchError, Result};
use crate::utils::error_log::ErrorLog;
use crate::utils::monitor::SystemMonitor;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub runs: usize,
    pub pages: usize,
    pub invocations: usize,
    pub errors: usize,
    pub rows_written: usize,
    pub skipped_pages: usize,
    pub output_path: String,
    pub error_log_path: String,
    pub duration: Duration,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} run(s) over {} page(s) completed with {} error(s)",
            self.runs, self.pages, self.errors
        )
    }
}

struct OutputPlan {
    write_header: bool,
    leading_newline: bool,
}

pub struct BatchEngine<A: Auditor, S: Storage, C: ConfigProvider> {
    auditor: A,
    storage: S,
    config: C,
    monitor_enabled: bool,
}

impl<A: Auditor, S: Storage, C: ConfigProvider> BatchEngine<A, S, C> {
    pub fn new(auditor: A, storage: S, config: C) -> Self {
        Self::new_with_monitoring(auditor, storage, config, false)
    }

    pub fn new_with_monitoring(auditor: A, storage: S, config: C, monitor_enabled: bool) -> Self {
        Self {
            auditor,
            storage,
            config,
            monitor_enabled,
        }
    }

    pub async fn load_pages(&self) -> Result<Vec<PageRow>> {
        let input_path = self.config.input_path();
        let bytes = self.storage.read_file(input_path).await?;
        let content = String::from_utf8(bytes).map_err(|e| BatchError::InputError {
            line: 0,
            message: format!("{} is not valid UTF-8: {}", input_path, e),
        })?;

        PageRow::parse_list(&content, self.config.metadata_headings().len())
    }

    // 覆寫模式先清空輸出；附加模式只在檔案為空時寫標題列
    async fn prepare_output(&self) -> Result<OutputPlan> {
        let output_path = self.config.output_path();

        if !self.config.append_output() {
            self.storage.write_file(output_path, b"").await?;
            return Ok(OutputPlan {
                write_header: true,
                leading_newline: false,
            });
        }

        match self.storage.read_file(output_path).await {
            Ok(existing) if existing.iter().all(u8::is_ascii_whitespace) => Ok(OutputPlan {
                write_header: true,
                leading_newline: false,
            }),
            Ok(existing) => Ok(OutputPlan {
                write_header: false,
                leading_newline: !existing.ends_with(b"\n"),
            }),
            Err(BatchError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(OutputPlan {
                    write_header: true,
                    leading_newline: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn run(&self) -> Result<BatchSummary> {
        let pages = self.load_pages().await?;
        tracing::info!("📄 Loaded {} page(s) from {}", pages.len(), self.config.input_path());
        if pages.is_empty() {
            tracing::warn!("⚠️ Input list is empty; only the header will be written");
        }

        let plan = self.prepare_output().await?;
        let mut error_log = ErrorLog::new(&self.storage, self.config.error_log_path());
        error_log.reset().await?;

        tracing::info!(
            "🚦 Auditing {} page(s) x {} run(s), aggregating by {}",
            pages.len(),
            self.config.runs(),
            self.config.score_method()
        );

        let outcome = RunLoop::new(&self.auditor, RunSettings::from_config(&self.config))
            .with_monitor(SystemMonitor::new(self.monitor_enabled))
            .run(&pages, &mut error_log)
            .await;

        let options = FormatOptions {
            method: self.config.score_method(),
            include_vitals: self.config.include_vitals(),
            include_audits: self.config.include_audits(),
        };
        let formatted = format_csv(
            &outcome.accumulator,
            &self.config.metadata_headings(),
            &options,
            plan.write_header,
        )?;

        let mut data = Vec::with_capacity(formatted.csv.len() + 1);
        if plan.leading_newline {
            data.push(b'\n');
        }
        data.extend_from_slice(formatted.csv.as_bytes());
        self.storage
            .append_file(self.config.output_path(), &data)
            .await?;

        let summary = BatchSummary {
            runs: self.config.runs(),
            pages: pages.len(),
            invocations: outcome.invocations,
            errors: error_log.count(),
            rows_written: formatted.rows,
            skipped_pages: formatted.skipped_pages.len(),
            output_path: self.config.output_path().to_string(),
            error_log_path: self.config.error_log_path().to_string(),
            duration: outcome.duration,
        };
        tracing::info!("🏁 {} in {:?}", summary, summary.duration);

        Ok(summary)
    }
}
