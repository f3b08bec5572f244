use crate::utils::error::{ReportError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Source spreadsheet column names.
pub mod columns {
    pub const AIRCRAFT: &str = "Aircraft Registration";
    pub const REPORT_TYPE: &str = "Type of report";
    pub const EVENT_TIME: &str = "Date & Time of Event (UTC)";
    pub const DETAILS: &str = "Details";
    pub const FLIGHT_NUMBER: &str = "Flight Number";
    pub const DEPARTURE: &str = "Departure";
    pub const DESTINATION: &str = "Destination";
    pub const REPORT_ID: &str = "Report ID";
    pub const STATUS: &str = "Status";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// 轉成去除空白的文字；空值回傳 None
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }
}

/// Flight numbers stored as numeric cells must not come back as `123.0`.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based row number in the source sheet
    pub number: usize,
    pub cells: Vec<CellValue>,
}

impl SheetRow {
    pub fn get(&self, index: usize) -> &CellValue {
        self.cells.get(index).unwrap_or(&EMPTY_CELL)
    }
}

/// Epoch used by the numeric date serials of a workbook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateSystem {
    /// serial 1 = 1900-01-01 (with Excel's phantom 1900-02-29)
    #[default]
    Excel1900,
    /// serial 0 = 1904-01-01, `<workbookPr date1904="1"/>`
    Excel1904,
}

impl DateSystem {
    pub fn epoch(&self) -> NaiveDate {
        match self {
            DateSystem::Excel1900 => NaiveDate::from_ymd_opt(1899, 12, 30),
            DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1),
        }
        .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
    pub date_system: DateSystem,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
            date_system: DateSystem::default(),
        }
    }

    /// Appends a data row; row numbers continue after the header row.
    pub fn push_row(&mut self, cells: Vec<CellValue>) {
        let number = self.rows.last().map(|r| r.number + 1).unwrap_or(2);
        self.rows.push(SheetRow { number, cells });
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// 依名稱選擇工作表；未指定時使用第一張
    pub fn sheet(&self, name: Option<&str>) -> Result<&Sheet> {
        match name {
            Some(name) => self
                .sheets
                .iter()
                .find(|s| s.name == name || s.name.trim() == name.trim())
                .ok_or_else(|| ReportError::SheetNotFound {
                    name: name.to_string(),
                    available: self.sheet_names(),
                }),
            None => self
                .sheets
                .first()
                .ok_or_else(|| ReportError::workbook("workbook contains no sheets")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        crate::utils::validation::validate_date_range("date_range", start, end)?;
        Ok(Self { start, end })
    }

    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        let day = timestamp.date();
        day >= self.start && day <= self.end
    }

    pub fn document_file_name(&self) -> String {
        format!(
            "Translated_Report_{}-{}.docx",
            self.start.format("%d.%m.%y"),
            self.end.format("%d.%m.%y")
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum GroupOrder {
    /// (report type, aircraft registration)
    #[default]
    TypeAircraft,
    /// (aircraft registration, report type)
    AircraftType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// aircraft / flight / date / text
    V1,
    /// aircraft / report id / text / date / route / count / status
    #[default]
    V2,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub report_type: String,
    pub aircraft: String,
}

impl GroupKey {
    pub fn ordered(&self, order: GroupOrder) -> (&str, &str) {
        match order {
            GroupOrder::TypeAircraft => (&self.report_type, &self.aircraft),
            GroupOrder::AircraftType => (&self.aircraft, &self.report_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub row: usize,
    pub aircraft: String,
    pub report_type: String,
    pub timestamp: NaiveDateTime,
    pub flight_number: Option<String>,
    pub departure: Option<String>,
    pub destination: Option<String>,
    pub report_id: Option<String>,
    pub details: String,
    pub status: Option<String>,
}

impl ReportRecord {
    pub fn key(&self) -> GroupKey {
        GroupKey {
            report_type: self.report_type.clone(),
            aircraft: self.aircraft.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub row: Option<usize>,
    pub aircraft: String,
    pub report_type: String,
    pub date: Option<NaiveDateTime>,
    pub flight_number: Option<String>,
    pub departure: Option<String>,
    pub destination: Option<String>,
    pub report_id: Option<String>,
    pub status: Option<String>,
    pub similar_count: usize,
    pub original: String,
    pub translation: String,
}

impl TranslationRecord {
    pub fn from_report(record: &ReportRecord, translation: String, similar_count: usize) -> Self {
        Self {
            row: Some(record.row),
            aircraft: record.aircraft.clone(),
            report_type: record.report_type.clone(),
            date: Some(record.timestamp),
            flight_number: record.flight_number.clone(),
            departure: record.departure.clone(),
            destination: record.destination.clone(),
            report_id: record.report_id.clone(),
            status: record.status.clone(),
            similar_count,
            original: record.details.clone(),
            translation,
        }
    }

    pub fn date_display(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }

    /// `"{flight} / {departure}-{destination}"` when both airports are known,
    /// `"{departure}-{destination}"` when the flight number is blank.
    pub fn route(&self) -> String {
        let flight = self.flight_number.as_deref().unwrap_or("");
        match (self.departure.as_deref(), self.destination.as_deref()) {
            (Some(dep), Some(dst)) if flight.is_empty() => format!("{}-{}", dep, dst),
            (Some(dep), Some(dst)) => format!("{} / {}-{}", flight, dep, dst),
            _ => flight.to_string(),
        }
    }
}
