use crate::domain::model::{columns, CellValue, DateSystem, Sheet, SheetRow};
use crate::utils::error::{ReportError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Largest serial Excel accepts (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub row: SheetRow,
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedSheet {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn epoch(system: DateSystem) -> NaiveDateTime {
    system.epoch().and_time(NaiveTime::MIN)
}

/// Serial → date/time in the given date system, rounded to the nearest second.
pub fn serial_to_datetime(serial: f64, system: DateSystem) -> Option<NaiveDateTime> {
    let lower = match system {
        DateSystem::Excel1900 => 0.0,
        DateSystem::Excel1904 => -1.0,
    };
    if !serial.is_finite() || serial <= lower || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let seconds = (serial * 86_400.0).round() as i64;
    epoch(system).checked_add_signed(Duration::seconds(seconds))
}

/// 1900 date system serial → date/time.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    serial_to_datetime(serial, DateSystem::Excel1900)
}

pub fn datetime_to_excel_serial(value: &NaiveDateTime) -> f64 {
    let seconds = value
        .signed_duration_since(epoch(DateSystem::Excel1900))
        .num_seconds();
    seconds as f64 / 86_400.0
}

pub fn parse_timestamp_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// 無法解析的值一律視為缺值，不回傳錯誤
pub fn parse_timestamp(cell: &CellValue) -> Option<NaiveDateTime> {
    parse_timestamp_in(cell, DateSystem::Excel1900)
}

pub fn parse_timestamp_in(cell: &CellValue, system: DateSystem) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Number(serial) => serial_to_datetime(*serial, system),
        CellValue::Text(text) => parse_timestamp_text(text),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

pub fn clean_headers(headers: &[String]) -> Vec<String> {
    headers.iter().map(|h| h.trim().to_string()).collect()
}

/// Strips header whitespace and parses the event timestamp column.
pub fn normalize_sheet(sheet: &Sheet) -> Result<NormalizedSheet> {
    let headers = clean_headers(&sheet.headers);
    let time_index = headers
        .iter()
        .position(|h| h == columns::EVENT_TIME)
        .ok_or_else(|| ReportError::ColumnNotFound {
            column: columns::EVENT_TIME.to_string(),
        })?;

    let mut unparsed = 0usize;
    let rows: Vec<NormalizedRow> = sheet
        .rows
        .iter()
        .map(|row| {
            let cell = row.get(time_index);
            let timestamp = parse_timestamp_in(cell, sheet.date_system);
            if timestamp.is_none() && !cell.is_empty() {
                unparsed += 1;
            }
            NormalizedRow {
                row: row.clone(),
                timestamp,
            }
        })
        .collect();

    if unparsed > 0 {
        tracing::warn!(
            "⚠️ {} row(s) in '{}' have an unreadable '{}' value and will be skipped",
            unparsed,
            sheet.name,
            columns::EVENT_TIME
        );
    }

    Ok(NormalizedSheet {
        name: sheet.name.clone(),
        headers,
        rows,
    })
}
