use clap::Parser;
use lighthouse_batch::config::toml_config::TomlConfig;
use lighthouse_batch::config::AuditorKind;
use lighthouse_batch::core::ConfigProvider;
use lighthouse_batch::utils::error::ErrorSeverity;
use lighthouse_batch::utils::{logger, validation::Validate};
use lighthouse_batch::{AnyAuditor, AuditorSettings, BatchEngine, LocalStorage};

#[derive(Parser)]
#[command(name = "toml-batch")]
#[command(about = "Lighthouse batch driven by a TOML job file")]
struct Args {
    /// Path to TOML job file
    #[arg(short, long, default_value = "lighthouse-batch.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the run count from config
    #[arg(long)]
    runs: Option<usize>,

    /// Dry run - list the pages and audit count without launching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    let verbose = args.verbose
        || config
            .monitoring
            .as_ref()
            .and_then(|m| m.log_level.as_deref())
            .is_some_and(|level| level.eq_ignore_ascii_case("debug"));
    logger::init_cli_logger(verbose);

    tracing::info!("🚀 Starting TOML-based lighthouse batch");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(runs) = args.runs {
        config.job.runs = Some(runs);
        tracing::info!("🔧 Run count overridden to: {}", runs);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let api_key = config
        .auditor
        .api_key
        .clone()
        .or_else(|| std::env::var("PAGESPEED_API_KEY").ok());
    let auditor = AnyAuditor::from_kind(
        config.auditor.kind,
        AuditorSettings {
            lighthouse_bin: config.lighthouse_bin(),
            api_key,
            endpoint: config.auditor.endpoint.as_deref(),
            strategy: config.auditor.strategy,
        },
    );
    let storage = LocalStorage::new(".".to_string());
    let runs = config.runs();
    let engine = BatchEngine::new_with_monitoring(auditor, storage, config, monitor_enabled);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No audits will be launched");
        let pages = engine.load_pages().await?;
        println!("🔍 Dry Run Analysis:");
        for (index, page) in pages.iter().enumerate() {
            println!("  {:>3}. [{}] {}", index + 1, page.fields.join(", "), page.url);
        }
        println!();
        println!(
            "  {} page(s) x {} run(s) = {} audit(s)",
            pages.len(),
            runs,
            pages.len() * runs
        );
        return Ok(());
    }

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
                "❌ Batch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

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

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Job: {}", config.job.name);
    println!("  Input: {} (header: {})", config.input_path(), config.metadata_header());
    println!(
        "  Output: {} ({})",
        config.output_path(),
        if config.append_output() { "append" } else { "overwrite" }
    );
    println!("  Error log: {}", config.error_log_path());
    match config.auditor.kind {
        AuditorKind::Lighthouse => println!("  Auditor: lighthouse ({})", config.lighthouse_bin()),
        AuditorKind::Pagespeed => println!("  Auditor: pagespeed ({})", config.auditor.strategy),
    }
    println!("  Categories: {}", config.categories().join(", "));
    println!("  Runs: {} ({})", config.runs(), config.score_method());
    println!("  Vitals: {}, Audits: {}", config.include_vitals(), config.include_audits());

    if let Some(timeout) = config.timeout_secs() {
        println!("  Timeout per audit: {}s", timeout);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}
