use clap::Parser;
use flyone_report::adapters::{build_translator, load_corrector, CorrectionSource};
use flyone_report::core::ConfigProvider;
use flyone_report::domain::category::Category;
use flyone_report::utils::error::ReportError;
use flyone_report::utils::{logger, validation::Validate};
use flyone_report::{LocalStorage, ReportEngine, ReportPipeline, RunOutcome, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-report")]
#[command(about = "Safety report translation driven by a TOML file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "report-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be processed without executing
    #[arg(long)]
    dry_run: bool,
}

fn fail(e: &ReportError) -> ! {
    tracing::error!(
        "❌ Report run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    logger::init_cli_logger(args.verbose || config.log_level() == Some("debug"));

    tracing::info!("🚀 Starting TOML-based report run");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config).unwrap_or_else(|e| fail(&e));
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let translator = build_translator(&config.translator_settings()).unwrap_or_else(|e| fail(&e));
    let corrector = load_corrector(&config.correction_source())
        .await
        .unwrap_or_else(|e| fail(&e));

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = ReportPipeline::new(storage, config, translator, corrector);
    let engine = ReportEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(RunOutcome::Exported(paths)) => {
            tracing::info!("✅ Report run completed successfully!");
            println!("✅ Report run completed successfully!");
            for path in paths {
                println!("📁 Output saved to: {}", path);
            }
        }
        Ok(RunOutcome::NoReports) => {
            println!("ℹ️ No reports found in selected date range.");
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Report: {}", config.report.name);
    if let Some(description) = &config.report.description {
        println!("  Description: {}", description);
    }
    println!("  Input: {}", config.input_file());
    println!(
        "  Range: {} .. {}",
        config.filter.start_date, config.filter.end_date
    );
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.export.formats.join(", "));

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> Result<(), ReportError> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📖 Input:");
    println!("  Workbook: {}", config.input_file());
    println!(
        "  Sheet: {}",
        config.sheet_name().unwrap_or("(first sheet)")
    );
    let range = config.date_range()?;
    println!("  Range: {} .. {} (inclusive)", range.start, range.end);

    println!();
    println!("🗂️ Grouping: {:?}", config.group_order());

    let settings = config.translator_settings();
    println!();
    println!("🌐 Translation:");
    println!("  Provider: {}", settings.provider);
    if let Some(endpoint) = settings
        .endpoint
        .as_deref()
        .or(settings.provider.default_endpoint())
    {
        println!("  Endpoint: {}", endpoint);
    }
    println!("  Target language: {}", settings.target_language);
    println!("  Timeout: {}s", settings.timeout_seconds);

    println!();
    match config.correction_source() {
        CorrectionSource::Machine => println!("✏️ Corrections: keep machine text"),
        CorrectionSource::File(file) => println!("✏️ Corrections: from {}", file),
        CorrectionSource::Interactive => println!("✏️ Corrections: interactive"),
    }

    println!();
    println!("💾 Output Configuration:");
    println!("  Path: {}", config.output_path());
    if config.export_spreadsheet() {
        println!("  ✅ translated_reports.xlsx");
    }
    if config.export_csv() {
        println!("  ✅ translated_reports.csv");
    }
    if config.export_document() {
        println!(
            "  ✅ {} (schema {:?})",
            range.document_file_name(),
            config.schema_version()
        );
        match config.template_file() {
            Some(template) => println!("     template: {}", template),
            None => println!("     generated layout"),
        }
    }
    if let Some(review) = config.review_file() {
        println!("  ✅ {}", review);
    }

    let categories = config.category_map()?;
    if let Some(overrides) = &config.categories {
        println!();
        println!("🔄 Category Mapping Overrides:");
        for label in overrides.keys() {
            println!("  {} -> {}", label, categories.classify(label));
        }
    }
    println!();
    println!(
        "📂 Sections: {}",
        Category::ALL
            .iter()
            .map(|c| c.english_name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
