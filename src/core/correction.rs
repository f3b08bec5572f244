use crate::domain::model::TranslationRecord;
use crate::domain::ports::Corrector;
use crate::utils::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedTranslations {
    pub records: Vec<TranslationRecord>,
    pub edited: usize,
}

/// Runs every draft through the corrector. Similar counts are carried over
/// untouched.
pub fn apply_corrections(
    drafts: Vec<TranslationRecord>,
    corrector: &dyn Corrector,
) -> Result<CorrectedTranslations> {
    let mut edited = 0usize;
    let mut records = Vec::with_capacity(drafts.len());

    for mut record in drafts {
        if let Some(text) = corrector.correct(&record)? {
            if text != record.translation {
                tracing::debug!("✏️ Row {:?} translation edited", record.row);
                edited += 1;
                record.translation = text;
            }
        }
        records.push(record);
    }

    Ok(CorrectedTranslations { records, edited })
}

/// [`apply_corrections`] on the blocking pool; correctors may wait on the
/// terminal or read files.
pub async fn apply_corrections_blocking(
    drafts: Vec<TranslationRecord>,
    corrector: Arc<dyn Corrector>,
) -> Result<CorrectedTranslations> {
    tokio::task::spawn_blocking(move || apply_corrections(drafts, corrector.as_ref())).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ReportError;

    struct UppercaseEven;

    impl Corrector for UppercaseEven {
        fn correct(&self, record: &TranslationRecord) -> Result<Option<String>> {
            Ok(match record.row {
                Some(row) if row % 2 == 0 => Some(record.translation.to_uppercase()),
                _ => None,
            })
        }
    }

    fn draft(row: usize) -> TranslationRecord {
        TranslationRecord {
            row: Some(row),
            aircraft: "EK-001".to_string(),
            report_type: "Technical".to_string(),
            date: None,
            flight_number: None,
            departure: None,
            destination: None,
            report_id: None,
            status: None,
            similar_count: 2,
            original: "leak".to_string(),
            translation: "leak".to_string(),
        }
    }

    #[test]
    fn test_edits_keep_similar_count() {
        let result = apply_corrections(vec![draft(2), draft(3)], &UppercaseEven).unwrap();
        assert_eq!(result.edited, 1);
        assert_eq!(result.records[0].translation, "LEAK");
        assert_eq!(result.records[1].translation, "leak");
        assert!(result.records.iter().all(|r| r.similar_count == 2));
    }

    struct PanicsOnRow(usize);

    impl Corrector for PanicsOnRow {
        fn correct(&self, record: &TranslationRecord) -> Result<Option<String>> {
            if record.row == Some(self.0) {
                panic!("corrector failed on row {}", self.0);
            }
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_blocking_pass_matches_inline_pass() {
        let result = apply_corrections_blocking(vec![draft(2), draft(3)], Arc::new(UppercaseEven))
            .await
            .unwrap();
        assert_eq!(result.edited, 1);
        assert_eq!(result.records[0].translation, "LEAK");
    }

    #[tokio::test]
    async fn test_blocking_pass_reports_panics() {
        let err = apply_corrections_blocking(vec![draft(2)], Arc::new(PanicsOnRow(2)))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::TaskError(_)));
    }
}
