use crate::core::correction::apply_corrections_blocking;
use crate::core::filter::{filter_by_date, FilteredRows};
use crate::core::grouping::{group_reports, Grouping};
use crate::core::normalize::normalize_sheet;
use crate::core::translation::TranslationAdapter;
use crate::domain::model::{DateRange, GroupOrder, TranslationRecord, Workbook};
use crate::domain::ports::Corrector;
use crate::utils::error::Result;
use std::sync::Arc;

/// State of one operator run: the filtered rows of the chosen sheet. Passed
/// by value from stage to stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSession {
    pub range: DateRange,
    pub filtered: FilteredRows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformResult {
    pub range: DateRange,
    pub records: Vec<TranslationRecord>,
    pub group_count: usize,
    pub failed_translations: usize,
    pub edited: usize,
}

impl ReportSession {
    /// Normalizes the chosen sheet and applies the date filter.
    pub fn open(workbook: &Workbook, sheet: Option<&str>, range: DateRange) -> Result<Self> {
        let sheet = workbook.sheet(sheet)?;
        tracing::info!(
            "📑 Using sheet '{}' ({} data rows)",
            sheet.name,
            sheet.rows.len()
        );
        let normalized = normalize_sheet(sheet)?;
        let filtered = filter_by_date(normalized, &range);
        Ok(Self { range, filtered })
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }

    pub fn group(&self, order: GroupOrder) -> Result<Grouping> {
        group_reports(&self.filtered, order)
    }

    /// group → translate → correct
    pub async fn translate(
        self,
        order: GroupOrder,
        adapter: &TranslationAdapter,
        corrector: Arc<dyn Corrector>,
    ) -> Result<TransformResult> {
        let grouping = self.group(order)?;
        for group in &grouping.groups {
            let (first, second) = group.key.ordered(order);
            tracing::info!("✈️ {} / {} ({})", first, second, group.similar_count());
        }

        let drafts = adapter.draft(&grouping).await;
        if drafts.failed > 0 {
            tracing::warn!(
                "⚠️ {} of {} translations failed and were replaced with the failure marker",
                drafts.failed,
                drafts.records.len()
            );
        }

        let corrected = apply_corrections_blocking(drafts.records, corrector).await?;

        Ok(TransformResult {
            range: self.range,
            records: corrected.records,
            group_count: grouping.groups.len(),
            failed_translations: drafts.failed,
            edited: corrected.edited,
        })
    }
}
