use crate::core::grouping::Grouping;
use crate::domain::model::TranslationRecord;
use crate::domain::ports::Translator;

/// Text stored when the backend could not translate a report.
pub const TRANSLATION_FAILED: &str = "[Թարգմանությունը ձախողվեց]";

#[derive(Debug, Clone, PartialEq)]
pub struct DraftTranslations {
    pub records: Vec<TranslationRecord>,
    pub failed: usize,
}

/// Wraps a backend so that callers always get text back.
pub struct TranslationAdapter {
    backend: Box<dyn Translator>,
}

impl TranslationAdapter {
    pub fn new(backend: Box<dyn Translator>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Returns `None` when the backend failed.
    async fn try_translate(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return Some(String::new());
        }
        match self.backend.translate(text).await {
            Ok(translated) => Some(translated),
            Err(e) => {
                tracing::warn!("⚠️ {} translation failed: {}", self.backend.name(), e);
                None
            }
        }
    }

    pub async fn translate(&self, text: &str) -> String {
        self.try_translate(text)
            .await
            .unwrap_or_else(|| TRANSLATION_FAILED.to_string())
    }

    /// One backend call per record, sequentially and without retry.
    pub async fn draft(&self, grouping: &Grouping) -> DraftTranslations {
        let total = grouping.record_count();
        let mut records = Vec::with_capacity(total);
        let mut failed = 0usize;

        for (index, (record, similar_count)) in grouping.records_with_counts().enumerate() {
            tracing::debug!(
                "🌐 Translating row {} ({}/{}) [{} / {}]",
                record.row,
                index + 1,
                total,
                record.report_type,
                record.aircraft
            );
            let translation = match self.try_translate(&record.details).await {
                Some(text) => text,
                None => {
                    failed += 1;
                    TRANSLATION_FAILED.to_string()
                }
            };
            records.push(TranslationRecord::from_report(
                record,
                translation,
                similar_count,
            ));
        }

        DraftTranslations { records, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::{ReportError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FailingTranslator;

    #[async_trait]
    impl Translator for FailingTranslator {
        async fn translate(&self, _text: &str) -> Result<String> {
            Err(ReportError::TranslationError {
                message: "quota exceeded".to_string(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct CountingTranslator {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Translator for CountingTranslator {
        async fn translate(&self, text: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("hy:{}", text))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_failure_becomes_sentinel() {
        let adapter = TranslationAdapter::new(Box::new(FailingTranslator));
        assert_eq!(adapter.translate("Door seal damaged").await, TRANSLATION_FAILED);
    }

    #[tokio::test]
    async fn test_blank_text_skips_backend() {
        let calls = Arc::new(AtomicUsize::new(0));
        let adapter = TranslationAdapter::new(Box::new(CountingTranslator {
            calls: calls.clone(),
        }));
        assert_eq!(adapter.translate("   ").await, "");
        assert_eq!(adapter.translate("Door").await, "hy:Door");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
