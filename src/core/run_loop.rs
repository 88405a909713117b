use crate::core::accumulator::Accumulator;
use crate::domain::model::{AuditOptions, PageRow};
use crate::domain::ports::{Auditor, ConfigProvider, Storage};
use crate::utils::error_log::ErrorLog;
use crate::utils::monitor::SystemMonitor;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSettings {
    pub runs: usize,
    pub options: AuditOptions,
    pub include_vitals: bool,
    pub include_audits: bool,
}

impl RunSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            runs: config.runs(),
            options: config.audit_options(),
            include_vitals: config.include_vitals(),
            include_audits: config.include_audits(),
        }
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub accumulator: Accumulator,
    pub invocations: usize,
    pub failed_audits: usize,
    pub discarded_samples: usize,
    pub duration: Duration,
}

/// 每個 (回合, 頁面) 恰好稽核一次，一次只跑一個。
/// 失敗的格子記錄後略過，不重試。
pub struct RunLoop<'a, A: Auditor> {
    auditor: &'a A,
    settings: RunSettings,
    monitor: SystemMonitor,
}

impl<'a, A: Auditor> RunLoop<'a, A> {
    pub fn new(auditor: &'a A, settings: RunSettings) -> Self {
        Self {
            auditor,
            settings,
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub async fn run<S: Storage>(
        &self,
        pages: &[PageRow],
        error_log: &mut ErrorLog<'_, S>,
    ) -> RunOutcome {
        let started = Instant::now();
        let runs = self.settings.runs;
        let mut accumulator = Accumulator::new();
        let mut invocations = 0;
        let mut failed_audits = 0;
        let mut discarded_samples = 0;

        for run in 0..runs {
            tracing::info!("🔁 Run {}/{} over {} page(s)", run + 1, runs, pages.len());

            for (page_index, page) in pages.iter().enumerate() {
                let context = format!(
                    "run {}/{}, page {}/{} ({})",
                    run + 1,
                    runs,
                    page_index + 1,
                    pages.len(),
                    page.url
                );
                tracing::debug!("Auditing {}", context);

                invocations += 1;
                // 逾時由 auditor 自行處理，回傳前瀏覽器已關閉
                let result = match self.auditor.run_audit(&page.url, &self.settings.options).await {
                    Ok(result) => result,
                    Err(e) => {
                        failed_audits += 1;
                        error_log.record(&context, &e.to_string()).await;
                        continue;
                    }
                };

                if let Some(runtime_error) = &result.runtime_error {
                    failed_audits += 1;
                    let message = format!(
                        "Lighthouse runtime error {}: {}",
                        runtime_error.code, runtime_error.message
                    );
                    error_log.record(&context, &message).await;
                    continue;
                }

                let discarded = accumulator.record(
                    page_index,
                    page,
                    &result.categories,
                    self.settings.include_vitals.then_some(&result.metrics),
                    self.settings
                        .include_audits
                        .then_some(result.audits.as_slice()),
                );
                for discard in &discarded {
                    error_log.record(&context, &discard.to_string()).await;
                }
                discarded_samples += discarded.len();
            }

            self.monitor.log_stats(&format!("Run {}/{}", run + 1, runs));
        }

        self.monitor.log_final_stats();

        RunOutcome {
            accumulator,
            invocations,
            failed_audits,
            discarded_samples,
            duration: started.elapsed(),
        }
    }
}
