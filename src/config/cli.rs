use crate::adapters::correction::CorrectionSource;
use crate::adapters::translator::{TranslationProvider, TranslatorSettings};
use crate::core::ConfigProvider;
use crate::domain::category::CategoryMap;
use crate::domain::model::{DateRange, GroupOrder, SchemaVersion};
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "flyone-report")]
#[command(about = "Filter, translate and export airline safety reports")]
pub struct CliConfig {
    /// Source workbook (.xlsx)
    #[arg(long, short)]
    pub input: String,

    /// Sheet to read; the first sheet when omitted
    #[arg(long)]
    pub sheet: Option<String>,

    /// First day of the range (YYYY-MM-DD)
    #[arg(long, required_unless_present = "list_sheets")]
    pub start: Option<NaiveDate>,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[arg(long, required_unless_present = "list_sheets")]
    pub end: Option<NaiveDate>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "hy")]
    pub target_lang: String,

    #[arg(long, value_enum, default_value_t = TranslationProvider::Google)]
    pub provider: TranslationProvider,

    /// Translation service base URL; provider default when omitted
    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    #[arg(long, value_enum, default_value_t = SchemaVersion::V2)]
    pub schema: SchemaVersion,

    #[arg(long, value_enum, default_value_t = GroupOrder::TypeAircraft)]
    pub group_order: GroupOrder,

    /// Word template with {{category}} anchors
    #[arg(long)]
    pub template: Option<String>,

    /// Edited translations (.csv or .xlsx with Row and Translation columns)
    #[arg(long)]
    pub corrections: Option<String>,

    /// Review every translation on the terminal
    #[arg(long)]
    pub interactive: bool,

    /// Also write a review CSV with this file name
    #[arg(long)]
    pub review_out: Option<String>,

    #[arg(long, help = "Skip the spreadsheet export")]
    pub no_spreadsheet: bool,

    #[arg(long, help = "Skip the Word export")]
    pub no_document: bool,

    #[arg(long, help = "Also write a CSV copy of the spreadsheet")]
    pub csv: bool,

    #[arg(long, help = "Print the sheet names of the input and exit")]
    pub list_sheets: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    pub fn translator_settings(&self) -> TranslatorSettings {
        TranslatorSettings {
            provider: self.provider,
            endpoint: self.endpoint.clone(),
            target_language: self.target_lang.clone(),
            api_key: self.api_key.clone(),
            timeout_seconds: self.timeout,
        }
    }

    pub fn correction_source(&self) -> CorrectionSource {
        match (&self.corrections, self.interactive) {
            (Some(path), _) => CorrectionSource::File(path.clone()),
            (None, true) => CorrectionSource::Interactive,
            (None, false) => CorrectionSource::Machine,
        }
    }
}

impl ConfigProvider for CliConfig {
    fn input_file(&self) -> &str {
        &self.input
    }

    fn sheet_name(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    fn date_range(&self) -> Result<DateRange> {
        let start = self.start.ok_or_else(|| ReportError::MissingConfigError {
            field: "start".to_string(),
        })?;
        let end = self.end.ok_or_else(|| ReportError::MissingConfigError {
            field: "end".to_string(),
        })?;
        DateRange::new(start, end)
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn group_order(&self) -> GroupOrder {
        self.group_order
    }

    fn schema_version(&self) -> SchemaVersion {
        self.schema
    }

    fn category_map(&self) -> Result<CategoryMap> {
        Ok(CategoryMap::default())
    }

    fn template_file(&self) -> Option<&str> {
        self.template.as_deref()
    }

    fn export_spreadsheet(&self) -> bool {
        !self.no_spreadsheet
    }

    fn export_document(&self) -> bool {
        !self.no_document
    }

    fn export_csv(&self) -> bool {
        self.csv
    }

    fn review_file(&self) -> Option<&str> {
        self.review_out.as_deref()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_file_extensions("input", &[self.input.clone()], &["xlsx"])?;
        if self.list_sheets {
            return Ok(());
        }

        self.date_range()?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_non_empty_string("target_lang", &self.target_lang)?;
        validation::validate_positive_number("timeout", self.timeout, 1)?;

        if let Some(endpoint) = &self.endpoint {
            validation::validate_url("endpoint", endpoint)?;
        }
        if let Some(template) = &self.template {
            validation::validate_file_extensions("template", &[template.clone()], &["docx"])?;
        }
        if let Some(corrections) = &self.corrections {
            validation::validate_file_extensions(
                "corrections",
                &[corrections.clone()],
                &["csv", "xlsx"],
            )?;
            if self.interactive {
                return Err(ReportError::InvalidConfigValueError {
                    field: "interactive".to_string(),
                    value: "true".to_string(),
                    reason: "--interactive cannot be combined with --corrections".to_string(),
                });
            }
        }
        if self.no_spreadsheet && self.no_document && !self.csv {
            return Err(ReportError::ConfigValidationError {
                field: "export".to_string(),
                message: "every export target is disabled".to_string(),
            });
        }

        Ok(())
    }
}
