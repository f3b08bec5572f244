//! Ways to correct machine translations before export.

use crate::adapters::xlsx::read_workbook;
use crate::domain::model::{CellValue, TranslationRecord};
use crate::domain::ports::Corrector;
use crate::utils::error::{ReportError, Result};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Mutex;

const COL_ROW: &str = "Row";
const COL_TRANSLATION: &str = "Translation";

/// Review sheet columns; the same layout is accepted back by
/// [`CorrectionsFile`].
pub const REVIEW_COLUMNS: [&str; 5] = ["Row", "Aircraft", "Type", "Original", "Translation"];

/// Keeps every machine translation.
pub struct AcceptMachine;

impl Corrector for AcceptMachine {
    fn correct(&self, _record: &TranslationRecord) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Edited translations keyed by source row number, loaded from a CSV file
/// or a spreadsheet with `Row` and `Translation` columns. Blank translation
/// cells keep the machine text, the same as an empty interactive answer.
#[derive(Debug, Clone, Default)]
pub struct CorrectionsFile {
    translations: HashMap<usize, String>,
}

impl CorrectionsFile {
    pub async fn load(path: &str) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ReportError::InvalidConfigValueError {
                field: "corrections".to_string(),
                value: path.to_string(),
                reason: e.to_string(),
            }
        })?;
        let is_xlsx = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("xlsx"))
            .unwrap_or(false);

        let corrections = if is_xlsx {
            Self::from_xlsx(bytes)?
        } else {
            Self::from_csv(&bytes)?
        };
        tracing::info!(
            "✏️ Loaded {} corrections from {}",
            corrections.len(),
            path
        );
        Ok(corrections)
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(bytes);
        let headers = reader.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);
        let (row_idx, text_idx) = Self::required(position(COL_ROW), position(COL_TRANSLATION))?;

        let mut translations = HashMap::new();
        for result in reader.records() {
            let record = result?;
            let row = record.get(row_idx).and_then(|r| r.trim().parse::<usize>().ok());
            match (row, record.get(text_idx)) {
                (Some(row), Some(text)) if !text.trim().is_empty() => {
                    translations.insert(row, text.to_string());
                }
                _ => {}
            }
        }
        Ok(Self { translations })
    }

    pub fn from_xlsx(bytes: Vec<u8>) -> Result<Self> {
        let workbook = read_workbook(bytes)?;
        let sheet = workbook.sheet(None)?;
        let position = |name: &str| sheet.headers.iter().position(|h| h.trim() == name);
        let (row_idx, text_idx) = Self::required(position(COL_ROW), position(COL_TRANSLATION))?;

        let mut translations = HashMap::new();
        for row in &sheet.rows {
            let number = match row.get(row_idx) {
                CellValue::Number(n) if *n >= 1.0 => Some(n.round() as usize),
                other => other.as_text().and_then(|t| t.parse().ok()),
            };
            let text = match row.get(text_idx) {
                CellValue::Text(text) => text.clone(),
                other => other.as_text().unwrap_or_default(),
            };
            match number {
                Some(number) if !text.trim().is_empty() => {
                    translations.insert(number, text);
                }
                _ => {}
            }
        }
        Ok(Self { translations })
    }

    fn required(row: Option<usize>, text: Option<usize>) -> Result<(usize, usize)> {
        match (row, text) {
            (Some(row), Some(text)) => Ok((row, text)),
            _ => {
                let mut columns = Vec::new();
                if row.is_none() {
                    columns.push(COL_ROW.to_string());
                }
                if text.is_none() {
                    columns.push(COL_TRANSLATION.to_string());
                }
                Err(ReportError::MissingColumns { columns })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }
}

impl Corrector for CorrectionsFile {
    fn correct(&self, record: &TranslationRecord) -> Result<Option<String>> {
        Ok(record
            .row
            .and_then(|row| self.translations.get(&row))
            .cloned())
    }
}

/// Shows each record on `output` and reads the replacement from `input`.
/// An empty line keeps the machine text.
pub struct InteractiveCorrector<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead + Send, W: Write + Send> InteractiveCorrector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new((input, output)),
        }
    }
}

impl InteractiveCorrector<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead + Send, W: Write + Send> Corrector for InteractiveCorrector<R, W> {
    fn correct(&self, record: &TranslationRecord) -> Result<Option<String>> {
        let mut guard = self
            .io
            .lock()
            .map_err(|_| ReportError::ValidationError {
                message: "interactive corrector lock poisoned".to_string(),
            })?;
        let (input, output) = &mut *guard;

        writeln!(
            output,
            "\n── Row {} | {} | {} ──",
            record.row.map(|r| r.to_string()).unwrap_or_default(),
            record.aircraft,
            record.report_type
        )?;
        writeln!(output, "Original:    {}", record.original.trim())?;
        writeln!(output, "Translation: {}", record.translation.trim())?;
        write!(output, "Edit (Enter to keep): ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let edited = line.trim_end_matches(['\r', '\n']);
        if edited.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(edited.to_string()))
        }
    }
}

/// Where manual edits come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionSource {
    Machine,
    File(String),
    Interactive,
}

pub async fn load_corrector(source: &CorrectionSource) -> Result<Box<dyn Corrector>> {
    Ok(match source {
        CorrectionSource::Machine => Box::new(AcceptMachine),
        CorrectionSource::File(path) => Box::new(CorrectionsFile::load(path).await?),
        CorrectionSource::Interactive => Box::new(InteractiveCorrector::stdio()),
    })
}

/// Draft translations as a CSV for offline editing.
pub fn write_review_csv(records: &[TranslationRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REVIEW_COLUMNS)?;
    for record in records {
        writer.write_record([
            record.row.map(|r| r.to_string()).unwrap_or_default(),
            record.aircraft.clone(),
            record.report_type.clone(),
            record.original.clone(),
            record.translation.clone(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::export("review CSV", e.error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::spreadsheet::export_spreadsheet;

    fn draft(row: usize, translation: &str) -> TranslationRecord {
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
            similar_count: 1,
            original: "Door seal, damaged".to_string(),
            translation: translation.to_string(),
        }
    }

    #[test]
    fn test_review_csv_feeds_back_as_corrections() {
        let review = write_review_csv(&[draft(2, "մեքենայական"), draft(3, "երկրորդ")]).unwrap();
        let edited = String::from_utf8(review)
            .unwrap()
            .replace("մեքենայական", "ձեռքով ուղղված");
        let corrections = CorrectionsFile::from_csv(edited.as_bytes()).unwrap();

        assert_eq!(corrections.len(), 2);
        assert_eq!(
            corrections.correct(&draft(2, "x")).unwrap().as_deref(),
            Some("ձեռքով ուղղված")
        );
        assert_eq!(corrections.correct(&draft(9, "x")).unwrap(), None);
    }

    #[test]
    fn test_corrections_from_exported_spreadsheet() {
        let bytes = export_spreadsheet(&[draft(4, "խմբագրված")]).unwrap();
        let corrections = CorrectionsFile::from_xlsx(bytes).unwrap();
        assert_eq!(
            corrections.correct(&draft(4, "x")).unwrap().as_deref(),
            Some("խմբագրված")
        );
    }

    #[test]
    fn test_blank_cells_keep_machine_text() {
        let corrections =
            CorrectionsFile::from_csv("Row,Translation\n2,\n3,   \n4,ուղղված\n".as_bytes())
                .unwrap();
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections.correct(&draft(2, "x")).unwrap(), None);
        assert_eq!(corrections.correct(&draft(3, "x")).unwrap(), None);

        let bytes = export_spreadsheet(&[draft(5, ""), draft(6, "  "), draft(7, "խմբագրված")])
            .unwrap();
        let corrections = CorrectionsFile::from_xlsx(bytes).unwrap();
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections.correct(&draft(5, "x")).unwrap(), None);
        assert_eq!(corrections.correct(&draft(6, "x")).unwrap(), None);
    }

    #[test]
    fn test_corrections_need_row_column() {
        let result = CorrectionsFile::from_csv(b"Aircraft,Translation\nEK-001,x\n");
        match result {
            Err(ReportError::MissingColumns { columns }) => assert_eq!(columns, vec!["Row"]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_interactive_keeps_on_empty_line() {
        let input = std::io::Cursor::new("\nուղղված տեքստ\n".as_bytes().to_vec());
        let corrector = InteractiveCorrector::new(input, Vec::new());

        assert_eq!(corrector.correct(&draft(2, "a")).unwrap(), None);
        assert_eq!(
            corrector.correct(&draft(3, "b")).unwrap().as_deref(),
            Some("ուղղված տեքստ")
        );
        // input exhausted
        assert_eq!(corrector.correct(&draft(4, "c")).unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_corrector_from_csv_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"Row,Translation\n7,fixed\n").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let corrector = load_corrector(&CorrectionSource::File(path)).await.unwrap();
        assert_eq!(
            corrector.correct(&draft(7, "x")).unwrap().as_deref(),
            Some("fixed")
        );
    }

    #[tokio::test]
    async fn test_missing_corrections_file() {
        let result = load_corrector(&CorrectionSource::File("/no/such/edits.csv".into())).await;
        assert!(matches!(
            result,
            Err(ReportError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_accept_machine() {
        assert_eq!(AcceptMachine.correct(&draft(2, "a")).unwrap(), None);
    }
}
