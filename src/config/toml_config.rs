use crate::adapters::correction::CorrectionSource;
use crate::adapters::translator::{TranslationProvider, TranslatorSettings};
use crate::core::ConfigProvider;
use crate::domain::category::CategoryMap;
use crate::domain::model::{DateRange, GroupOrder, SchemaVersion};
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub report: ReportConfig,
    pub input: InputConfig,
    pub filter: FilterConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub correction: CorrectionConfig,
    pub export: ExportConfig,
    /// 來源標籤 → 類別 key
    pub categories: Option<BTreeMap<String, String>>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub file: String,
    pub sheet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingConfig {
    #[serde(default)]
    pub order: GroupOrder,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub provider: TranslationProvider,
    pub endpoint: Option<String>,
    pub target_language: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionMode {
    #[default]
    Machine,
    File,
    Interactive,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrectionConfig {
    #[serde(default)]
    pub mode: CorrectionMode,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub output_path: String,
    pub formats: Vec<String>,
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub template: Option<String>,
    pub review_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
    pub system_stats: Option<bool>,
}

const VALID_FORMATS: [&str; 3] = ["xlsx", "docx", "csv"];

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ReportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${TRANSLATE_API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReportError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("report.name", &self.report.name)?;
        validation::validate_path("input.file", &self.input.file)?;
        validation::validate_file_extensions("input.file", &[self.input.file.clone()], &["xlsx"])?;
        validation::validate_date_range(
            "filter.start_date",
            self.filter.start_date,
            self.filter.end_date,
        )?;

        if let Some(endpoint) = &self.translation.endpoint {
            validation::validate_url("translation.endpoint", endpoint)?;
        }
        if let Some(timeout) = self.translation.timeout_seconds {
            validation::validate_positive_number("translation.timeout_seconds", timeout, 1)?;
        }
        if let Some(key) = &self.translation.api_key {
            if key.starts_with("${") {
                return Err(ReportError::MissingConfigError {
                    field: format!("translation.api_key ({})", key),
                });
            }
        }

        if self.correction.mode == CorrectionMode::File {
            let file = self
                .correction
                .file
                .as_ref()
                .ok_or_else(|| ReportError::MissingConfigError {
                    field: "correction.file".to_string(),
                })?;
            validation::validate_file_extensions("correction.file", &[file.clone()], &["csv", "xlsx"])?;
        }

        validation::validate_path("export.output_path", &self.export.output_path)?;
        if self.export.formats.is_empty() {
            return Err(ReportError::ConfigValidationError {
                field: "export.formats".to_string(),
                message: "at least one export format is required".to_string(),
            });
        }
        for format in &self.export.formats {
            if !VALID_FORMATS.contains(&format.as_str()) {
                return Err(ReportError::InvalidConfigValueError {
                    field: "export.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        VALID_FORMATS.join(", ")
                    ),
                });
            }
        }
        if let Some(template) = &self.export.template {
            validation::validate_file_extensions("export.template", &[template.clone()], &["docx"])?;
        }

        // 類別對照表中的 key 必須存在
        self.category_map()?;

        Ok(())
    }

    fn has_format(&self, format: &str) -> bool {
        self.export.formats.iter().any(|f| f == format)
    }

    pub fn translator_settings(&self) -> TranslatorSettings {
        let defaults = TranslatorSettings::default();
        TranslatorSettings {
            provider: self.translation.provider,
            endpoint: self.translation.endpoint.clone(),
            target_language: self
                .translation
                .target_language
                .clone()
                .unwrap_or(defaults.target_language),
            api_key: self.translation.api_key.clone(),
            timeout_seconds: self
                .translation
                .timeout_seconds
                .unwrap_or(defaults.timeout_seconds),
        }
    }

    pub fn correction_source(&self) -> CorrectionSource {
        match (self.correction.mode, &self.correction.file) {
            (CorrectionMode::File, Some(file)) => CorrectionSource::File(file.clone()),
            (CorrectionMode::Interactive, _) => CorrectionSource::Interactive,
            _ => CorrectionSource::Machine,
        }
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring
            .as_ref()
            .map(|m| m.enabled && m.system_stats.unwrap_or(true))
            .unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring.as_ref().and_then(|m| m.log_level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_file(&self) -> &str {
        &self.input.file
    }

    fn sheet_name(&self) -> Option<&str> {
        self.input.sheet.as_deref()
    }

    fn date_range(&self) -> Result<DateRange> {
        DateRange::new(self.filter.start_date, self.filter.end_date)
    }

    fn output_path(&self) -> &str {
        &self.export.output_path
    }

    fn group_order(&self) -> GroupOrder {
        self.grouping.order
    }

    fn schema_version(&self) -> SchemaVersion {
        self.export.schema_version
    }

    fn category_map(&self) -> Result<CategoryMap> {
        match &self.categories {
            Some(overrides) => CategoryMap::with_overrides(overrides),
            None => Ok(CategoryMap::default()),
        }
    }

    fn template_file(&self) -> Option<&str> {
        self.export.template.as_deref()
    }

    fn export_spreadsheet(&self) -> bool {
        self.has_format("xlsx")
    }

    fn export_document(&self) -> bool {
        self.has_format("docx")
    }

    fn export_csv(&self) -> bool {
        self.has_format("csv")
    }

    fn review_file(&self) -> Option<&str> {
        self.export.review_file.as_deref()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
