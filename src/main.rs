use clap::Parser;
use lighthouse_batch::core::ConfigProvider;
use lighthouse_batch::utils::error::ErrorSeverity;
use lighthouse_batch::utils::{logger, validation::Validate};
use lighthouse_batch::{AnyAuditor, AuditorSettings, BatchEngine, CliConfig, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting lighthouse-batch");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置，失敗時不開始任何稽核
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var("PAGESPEED_API_KEY").ok());
    let auditor = AnyAuditor::from_kind(
        config.auditor,
        AuditorSettings {
            lighthouse_bin: &config.lighthouse_bin,
            api_key,
            endpoint: None,
            strategy: config.strategy,
        },
    );
    let storage = LocalStorage::new(".".to_string());
    let runs = config.runs();

    let engine = BatchEngine::new_with_monitoring(auditor, storage, config, monitor_enabled);

    match engine.run().await {
        Ok(summary) => {
            tracing::info!("✅ Batch completed: {}", summary);
            println!("✅ {}", summary);
            println!("📁 Results saved to: {} ({} row(s))", summary.output_path, summary.rows_written);
            if summary.errors > 0 {
                println!("⚠️ {} error(s) logged to: {}", summary.errors, summary.error_log_path);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch of {} run(s) failed: {} (Category: {:?}, Severity: {:?})",
                runs,
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
