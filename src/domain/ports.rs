use crate::core::session::{ReportSession, TransformResult};
use crate::domain::category::CategoryMap;
use crate::domain::model::{DateRange, GroupOrder, SchemaVersion, TranslationRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_file(&self) -> &str;
    fn sheet_name(&self) -> Option<&str>;
    fn date_range(&self) -> Result<DateRange>;
    fn output_path(&self) -> &str;
    fn group_order(&self) -> GroupOrder;
    fn schema_version(&self) -> SchemaVersion;
    fn category_map(&self) -> Result<CategoryMap>;
    fn template_file(&self) -> Option<&str>;
    fn export_spreadsheet(&self) -> bool;
    fn export_document(&self) -> bool;
    fn export_csv(&self) -> bool;
    /// Review CSV of the final translations, written next to the exports.
    fn review_file(&self) -> Option<&str>;
}

/// Text-in / text-out translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Manual correction of a machine translation before export.
/// `Ok(None)` keeps the machine text.
pub trait Corrector: Send + Sync {
    fn correct(&self, record: &TranslationRecord) -> Result<Option<String>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ReportSession>;
    async fn transform(&self, session: ReportSession) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<Vec<String>>;
}
