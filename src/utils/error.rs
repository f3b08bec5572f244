use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("XML processing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Translation request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Workbook could not be read: {message}")]
    WorkbookError { message: String },

    #[error("Sheet '{name}' not found (available: {})", available.join(", "))]
    SheetNotFound { name: String, available: Vec<String> },

    #[error("'{column}' column not found")]
    ColumnNotFound { column: String },

    #[error("Required columns missing: {}", columns.iter().map(|c| format!("'{}'", c)).collect::<Vec<_>>().join(" or "))]
    MissingColumns { columns: Vec<String> },

    #[error("Translation backend error: {message}")]
    TranslationError { message: String },

    #[error("Failed to create {target}: {message}")]
    ExportError { target: String, message: String },

    #[error("Template anchor '{anchor}' not found in document body")]
    TemplateAnchorMissing { anchor: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Translation,
    Export,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl ReportError {
    pub fn export(target: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ReportError::ExportError {
            target: target.into(),
            message: message.to_string(),
        }
    }

    pub fn workbook(message: impl Into<String>) -> Self {
        ReportError::WorkbookError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::ConfigError { .. }
            | ReportError::ConfigValidationError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::ValidationError { .. } => ErrorCategory::Configuration,
            ReportError::WorkbookError { .. }
            | ReportError::SheetNotFound { .. }
            | ReportError::ColumnNotFound { .. }
            | ReportError::MissingColumns { .. }
            | ReportError::CsvError(_) => ErrorCategory::Input,
            ReportError::ApiError(_) | ReportError::TranslationError { .. } => {
                ErrorCategory::Translation
            }
            ReportError::ExportError { .. }
            | ReportError::TemplateAnchorMissing { .. }
            | ReportError::ZipError(_)
            | ReportError::XmlError(_)
            | ReportError::SerializationError(_) => ErrorCategory::Export,
            ReportError::IoError(_) | ReportError::TaskError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Translation => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Export => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ReportError::ColumnNotFound { column } => format!(
                "Make sure the selected sheet has a '{}' header in its first row",
                column
            ),
            ReportError::MissingColumns { columns } => format!(
                "Add the missing columns ({}) or pick another sheet",
                columns.join(", ")
            ),
            ReportError::SheetNotFound { available, .. } => {
                format!("Choose one of: {}", available.join(", "))
            }
            ReportError::WorkbookError { .. } | ReportError::ZipError(_) => {
                "Re-save the file as .xlsx and try again".to_string()
            }
            ReportError::TemplateAnchorMissing { anchor } => format!(
                "Add a paragraph containing exactly {} to the template, or export without a template",
                anchor
            ),
            ReportError::ApiError(_) | ReportError::TranslationError { .. } => {
                "Check the translation endpoint and network access".to_string()
            }
            ReportError::ConfigError { .. }
            | ReportError::ConfigValidationError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::ValidationError { .. } => {
                "Fix the configuration value and run again".to_string()
            }
            ReportError::ExportError { .. }
            | ReportError::XmlError(_)
            | ReportError::SerializationError(_) => {
                "Check the output directory and template file, then export again".to_string()
            }
            ReportError::CsvError(_) => "Check the corrections file format".to_string(),
            ReportError::IoError(_) => "Check file paths and permissions".to_string(),
            ReportError::TaskError(_) => "Run again; report the problem if it repeats".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Input problem: {}", self),
            ErrorCategory::Translation => format!("Translation problem: {}", self),
            ErrorCategory::Export => format!("Export problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = ReportError::MissingColumns {
            columns: vec![
                "Aircraft Registration".to_string(),
                "Type of report".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Required columns missing: 'Aircraft Registration' or 'Type of report'"
        );
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_column_not_found_message() {
        let err = ReportError::ColumnNotFound {
            column: "Date & Time of Event (UTC)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'Date & Time of Event (UTC)' column not found"
        );
        assert!(err.recovery_suggestion().contains("Date & Time of Event (UTC)"));
    }

    #[test]
    fn test_exit_codes_follow_severity() {
        let missing_key = ReportError::MissingConfigError {
            field: "translation.api_key".to_string(),
        };
        assert_eq!(missing_key.severity().exit_code(), 1);

        let backend = ReportError::TranslationError {
            message: "HTTP 429".to_string(),
        };
        assert_eq!(backend.severity().exit_code(), 2);

        let io = ReportError::IoError(std::io::Error::other("disk full"));
        assert_eq!(io.severity().exit_code(), 3);
        assert_eq!(ErrorSeverity::Low.exit_code(), 0);
    }

    #[test]
    fn test_export_error_is_named() {
        let err = ReportError::export("Word document", "broken table");
        assert_eq!(err.to_string(), "Failed to create Word document: broken table");
        assert_eq!(err.category(), ErrorCategory::Export);
        assert!(err.user_friendly_message().starts_with("Export problem"));
    }
}
