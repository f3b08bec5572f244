use clap::Parser;
use flyone_report::adapters::{build_translator, load_corrector, xlsx::read_workbook};
use flyone_report::utils::error::ReportError;
use flyone_report::utils::{logger, validation::Validate};
use flyone_report::{CliConfig, LocalStorage, ReportEngine, ReportPipeline, RunOutcome};

fn fail(e: &ReportError) -> ! {
    // 記錄詳細錯誤信息
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

async fn list_sheets(input: &str) -> Result<(), ReportError> {
    let bytes = tokio::fs::read(input)
        .await
        .map_err(|e| ReportError::workbook(format!("cannot read '{}': {}", input, e)))?;
    let workbook = read_workbook(bytes)?;
    println!("📑 Sheets in {}:", input);
    for name in workbook.sheet_names() {
        println!("  {}", name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting flyone-report CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.list_sheets {
        if let Err(e) = list_sheets(&config.input).await {
            fail(&e);
        }
        return Ok(());
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let translator = build_translator(&config.translator_settings()).unwrap_or_else(|e| fail(&e));
    let corrector = load_corrector(&config.correction_source())
        .await
        .unwrap_or_else(|e| fail(&e));

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output_path.clone());
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
