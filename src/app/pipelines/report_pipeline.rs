use crate::adapters::correction::write_review_csv;
use crate::adapters::xlsx::read_workbook;
use crate::core::session::{ReportSession, TransformResult};
use crate::core::translation::TranslationAdapter;
use crate::core::{ConfigProvider, Corrector, Pipeline, Storage, Translator};
use crate::export::document::compose_document;
use crate::export::spreadsheet::{self, CSV_FILE_NAME, SPREADSHEET_FILE_NAME};
use crate::utils::error::{ReportError, Result};
use std::path::Path;
use std::sync::Arc;

/// Workbook in, translated spreadsheet and Word report out.
pub struct ReportPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    translator: TranslationAdapter,
    corrector: Arc<dyn Corrector>,
}

impl<S: Storage, C: ConfigProvider> ReportPipeline<S, C> {
    pub fn new(
        storage: S,
        config: C,
        translator: Box<dyn Translator>,
        corrector: Box<dyn Corrector>,
    ) -> Self {
        Self {
            storage,
            config,
            translator: TranslationAdapter::new(translator),
            corrector: Arc::from(corrector),
        }
    }

    fn output_location(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .to_string()
    }

    async fn read_template(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.config.template_file() else {
            return Ok(None);
        };
        tracing::debug!("Using Word template {}", path);
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ReportError::export("Word document", format!("cannot read template '{}': {}", path, e))
        })?;
        Ok(Some(bytes))
    }

    /// Every output is composed before anything is written.
    async fn compose_outputs(&self, result: &TransformResult) -> Result<Vec<(String, Vec<u8>)>> {
        let mut outputs = Vec::new();

        if self.config.export_spreadsheet() {
            outputs.push((
                SPREADSHEET_FILE_NAME.to_string(),
                spreadsheet::export_spreadsheet(&result.records)?,
            ));
        }
        if self.config.export_csv() {
            outputs.push((
                CSV_FILE_NAME.to_string(),
                spreadsheet::export_csv(&result.records)?,
            ));
        }
        if self.config.export_document() {
            let categories = self.config.category_map()?;
            let template = self.read_template().await?;
            let document = compose_document(
                &result.records,
                &result.range,
                self.config.schema_version(),
                &categories,
                template,
            )?;
            outputs.push((result.range.document_file_name(), document));
        }
        if let Some(review) = self.config.review_file() {
            outputs.push((review.to_string(), write_review_csv(&result.records)?));
        }

        Ok(outputs)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ReportPipeline<S, C> {
    async fn extract(&self) -> Result<ReportSession> {
        let input = self.config.input_file();
        tracing::debug!("Reading workbook {}", input);
        let bytes = tokio::fs::read(input)
            .await
            .map_err(|e| ReportError::workbook(format!("cannot read '{}': {}", input, e)))?;

        let workbook = read_workbook(bytes)?;
        tracing::debug!("Sheets: {:?}", workbook.sheet_names());

        ReportSession::open(
            &workbook,
            self.config.sheet_name(),
            self.config.date_range()?,
        )
    }

    async fn transform(&self, session: ReportSession) -> Result<TransformResult> {
        tracing::info!(
            "🌐 Translating with {} backend",
            self.translator.backend_name()
        );
        session
            .translate(
                self.config.group_order(),
                &self.translator,
                Arc::clone(&self.corrector),
            )
            .await
    }

    async fn load(&self, result: TransformResult) -> Result<Vec<String>> {
        let outputs = self.compose_outputs(&result).await?;

        let mut written = Vec::with_capacity(outputs.len());
        for (name, data) in outputs {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(&name, &data).await?;
            written.push(self.output_location(&name));
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::correction::AcceptMachine;
    use crate::adapters::translator::PassthroughTranslator;
    use crate::domain::category::CategoryMap;
    use crate::domain::model::{
        columns, CellValue, DateRange, GroupOrder, SchemaVersion, Sheet,
    };
    use crate::export::spreadsheet::write_workbook;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MockStorage {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| ReportError::workbook(format!("{} not found", path)))
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct TestConfig {
        input: String,
        template: Option<String>,
        document: bool,
    }

    impl ConfigProvider for TestConfig {
        fn input_file(&self) -> &str {
            &self.input
        }
        fn sheet_name(&self) -> Option<&str> {
            None
        }
        fn date_range(&self) -> Result<DateRange> {
            DateRange::new(
                NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            )
        }
        fn output_path(&self) -> &str {
            "out"
        }
        fn group_order(&self) -> GroupOrder {
            GroupOrder::TypeAircraft
        }
        fn schema_version(&self) -> SchemaVersion {
            SchemaVersion::V2
        }
        fn category_map(&self) -> Result<CategoryMap> {
            Ok(CategoryMap::default())
        }
        fn template_file(&self) -> Option<&str> {
            self.template.as_deref()
        }
        fn export_spreadsheet(&self) -> bool {
            true
        }
        fn export_document(&self) -> bool {
            self.document
        }
        fn export_csv(&self) -> bool {
            false
        }
        fn review_file(&self) -> Option<&str> {
            Some("review.csv")
        }
    }

    fn input_workbook(dir: &TempDir) -> String {
        let mut sheet = Sheet::new(
            "Reports",
            vec![
                columns::AIRCRAFT.to_string(),
                columns::REPORT_TYPE.to_string(),
                columns::EVENT_TIME.to_string(),
                columns::DETAILS.to_string(),
            ],
        );
        sheet.push_row(vec![
            CellValue::Text("EK-001".to_string()),
            CellValue::Text("Technical".to_string()),
            CellValue::Text("2025-03-02 10:00".to_string()),
            CellValue::Text("Leak".to_string()),
        ]);
        let path = dir.path().join("reports.xlsx");
        std::fs::write(&path, write_workbook(&[sheet], &[]).unwrap()).unwrap();
        path.to_string_lossy().to_string()
    }

    fn pipeline(config: TestConfig) -> ReportPipeline<MockStorage, TestConfig> {
        ReportPipeline::new(
            MockStorage::default(),
            config,
            Box::new(PassthroughTranslator),
            Box::new(AcceptMachine),
        )
    }

    #[tokio::test]
    async fn test_load_writes_every_output() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(TestConfig {
            input: input_workbook(&dir),
            template: None,
            document: true,
        });

        let session = pipeline.extract().await.unwrap();
        let result = pipeline.transform(session).await.unwrap();
        assert_eq!(result.records[0].translation, "Leak");

        let written = pipeline.load(result).await.unwrap();
        assert_eq!(written.len(), 3);
        assert!(written[0].ends_with("translated_reports.xlsx"));

        let files = pipeline.storage.files.lock().unwrap();
        assert!(files.contains_key("translated_reports.xlsx"));
        assert!(files.contains_key("Translated_Report_01.03.25-31.03.25.docx"));
        assert!(files.contains_key("review.csv"));
    }

    #[tokio::test]
    async fn test_failed_document_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(TestConfig {
            input: input_workbook(&dir),
            template: Some(dir.path().join("missing.docx").to_string_lossy().to_string()),
            document: true,
        });

        let session = pipeline.extract().await.unwrap();
        let result = pipeline.transform(session).await.unwrap();
        let err = pipeline.load(result).await.unwrap_err();

        assert!(matches!(err, ReportError::ExportError { .. }));
        assert!(pipeline.storage.files.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let pipeline = pipeline(TestConfig {
            input: "/no/such/reports.xlsx".to_string(),
            template: None,
            document: false,
        });
        assert!(matches!(
            pipeline.extract().await,
            Err(ReportError::WorkbookError { .. })
        ));
    }
}
