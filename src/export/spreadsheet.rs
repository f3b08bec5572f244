//! Flat export: one row per translation record, no grouping.

use crate::adapters::xlsx::read_workbook;
use crate::core::normalize::{datetime_to_excel_serial, parse_timestamp};
use crate::domain::model::{CellValue, Sheet, TranslationRecord};
use crate::export::ooxml::{
    content_types, relationships, PackageWriter, XmlBuilder, REL_OFFICE_DOCUMENT, REL_STYLES,
};
use crate::utils::error::{ReportError, Result};

pub const SPREADSHEET_FILE_NAME: &str = "translated_reports.xlsx";
pub const CSV_FILE_NAME: &str = "translated_reports.csv";
pub const EXPORT_SHEET_NAME: &str = "Sheet1";

pub const COL_ROW: &str = "Row";
pub const COL_AIRCRAFT: &str = "Aircraft";
pub const COL_TYPE: &str = "Type";
pub const COL_DATE: &str = "Date";
pub const COL_FLIGHT: &str = "Flight Number";
pub const COL_DEPARTURE: &str = "Departure";
pub const COL_DESTINATION: &str = "Destination";
pub const COL_REPORT_ID: &str = "Report ID";
pub const COL_STATUS: &str = "Status";
pub const COL_SIMILAR_COUNT: &str = "Similar Count";
pub const COL_ORIGINAL: &str = "Original";
pub const COL_TRANSLATION: &str = "Translation";

/// Column order of the flat export.
pub const TABULAR_COLUMNS: [&str; 12] = [
    COL_ROW,
    COL_AIRCRAFT,
    COL_TYPE,
    COL_DATE,
    COL_FLIGHT,
    COL_DEPARTURE,
    COL_DESTINATION,
    COL_REPORT_ID,
    COL_STATUS,
    COL_SIMILAR_COUNT,
    COL_ORIGINAL,
    COL_TRANSLATION,
];

const SHEET_MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const WORKBOOK_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

/// Style 1 shows numeric serials as `yyyy-mm-dd hh:mm`.
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy-mm-dd hh:mm"/></numFmts><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// 0 → "A", 27 → "AB"
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

fn write_cell(
    xml: &mut XmlBuilder,
    reference: &str,
    value: &CellValue,
    date_style: bool,
) -> Result<()> {
    match value {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            xml.start("c", &[("r", reference), ("t", "inlineStr")])?;
            xml.start("is", &[])?;
            // readers decode `_xHHHH_`, so a literal `_x` is written as `_x005F_x`
            let escaped = text.replace("_x", "_x005F_x");
            xml.text_element("t", &[("xml:space", "preserve")], &escaped)?;
            xml.end("is")?;
            xml.end("c")?;
        }
        CellValue::Number(n) => {
            let mut attrs = vec![("r", reference)];
            if date_style {
                attrs.push(("s", "1"));
            }
            xml.start("c", &attrs)?;
            xml.text_element("v", &[], &n.to_string())?;
            xml.end("c")?;
        }
        CellValue::Bool(b) => {
            xml.start("c", &[("r", reference), ("t", "b")])?;
            xml.text_element("v", &[], if *b { "1" } else { "0" })?;
            xml.end("c")?;
        }
    }
    Ok(())
}

fn worksheet_xml(sheet: &Sheet, date_headers: &[&str]) -> Result<Vec<u8>> {
    let date_columns: Vec<bool> = sheet
        .headers
        .iter()
        .map(|h| date_headers.contains(&h.trim()))
        .collect();

    let mut xml = XmlBuilder::new();
    xml.declaration()?;
    xml.start("worksheet", &[("xmlns", SHEET_MAIN_NS)])?;
    xml.start("sheetData", &[])?;

    xml.start("row", &[("r", "1")])?;
    for (col, header) in sheet.headers.iter().enumerate() {
        let reference = format!("{}1", column_letters(col));
        write_cell(&mut xml, &reference, &CellValue::Text(header.clone()), false)?;
    }
    xml.end("row")?;

    for (i, row) in sheet.rows.iter().enumerate() {
        let number = (i + 2).to_string();
        xml.start("row", &[("r", number.as_str())])?;
        for (col, value) in row.cells.iter().enumerate() {
            let reference = format!("{}{}", column_letters(col), number);
            let date_style = date_columns.get(col).copied().unwrap_or(false);
            write_cell(&mut xml, &reference, value, date_style)?;
        }
        xml.end("row")?;
    }

    xml.end("sheetData")?;
    xml.end("worksheet")?;
    Ok(xml.into_bytes())
}

fn workbook_xml(sheets: &[Sheet]) -> Result<Vec<u8>> {
    let mut xml = XmlBuilder::new();
    xml.declaration()?;
    xml.start(
        "workbook",
        &[
            ("xmlns", SHEET_MAIN_NS),
            ("xmlns:r", crate::export::ooxml::NS_RELATIONSHIPS),
        ],
    )?;
    xml.start("sheets", &[])?;
    for (i, sheet) in sheets.iter().enumerate() {
        let sheet_id = (i + 1).to_string();
        let rel_id = format!("rId{}", i + 1);
        xml.empty(
            "sheet",
            &[
                ("name", sheet.name.as_str()),
                ("sheetId", sheet_id.as_str()),
                ("r:id", rel_id.as_str()),
            ],
        )?;
    }
    xml.end("sheets")?;
    xml.end("workbook")?;
    Ok(xml.into_bytes())
}

/// Writes sheets into an `.xlsx` archive in memory. Numeric cells under any
/// of `date_headers` get the date-time number format.
pub fn write_workbook(sheets: &[Sheet], date_headers: &[&str]) -> Result<Vec<u8>> {
    if sheets.is_empty() {
        return Err(ReportError::export("spreadsheet", "no sheets to write"));
    }

    let sheet_parts: Vec<String> = (1..=sheets.len())
        .map(|i| format!("/xl/worksheets/sheet{}.xml", i))
        .collect();
    let mut overrides: Vec<(&str, &str)> = vec![
        ("/xl/workbook.xml", WORKBOOK_CONTENT_TYPE),
        ("/xl/styles.xml", STYLES_CONTENT_TYPE),
    ];
    overrides.extend(sheet_parts.iter().map(|p| (p.as_str(), WORKSHEET_CONTENT_TYPE)));

    let rel_ids: Vec<String> = (1..=sheets.len()).map(|i| format!("rId{}", i)).collect();
    let targets: Vec<String> = (1..=sheets.len())
        .map(|i| format!("worksheets/sheet{}.xml", i))
        .collect();
    let styles_id = format!("rId{}", sheets.len() + 1);
    let mut workbook_rels: Vec<(&str, &str, &str)> = rel_ids
        .iter()
        .zip(&targets)
        .map(|(id, target)| (id.as_str(), REL_WORKSHEET, target.as_str()))
        .collect();
    workbook_rels.push((styles_id.as_str(), REL_STYLES, "styles.xml"));

    let mut package = PackageWriter::new();
    package.add("[Content_Types].xml", content_types(&[], &overrides)?);
    package.add(
        "_rels/.rels",
        relationships(&[("rId1", REL_OFFICE_DOCUMENT, "xl/workbook.xml")])?,
    );
    package.add("xl/workbook.xml", workbook_xml(sheets)?);
    package.add("xl/_rels/workbook.xml.rels", relationships(&workbook_rels)?);
    package.add("xl/styles.xml", STYLES_XML.as_bytes().to_vec());
    for (i, sheet) in sheets.iter().enumerate() {
        package.add(
            format!("xl/worksheets/sheet{}.xml", i + 1),
            worksheet_xml(sheet, date_headers)?,
        );
    }
    package.finish()
}

fn optional_text(value: &Option<String>) -> CellValue {
    match value {
        Some(text) => CellValue::Text(text.clone()),
        None => CellValue::Empty,
    }
}

fn record_cells(record: &TranslationRecord) -> Vec<CellValue> {
    vec![
        record
            .row
            .map(|r| CellValue::Number(r as f64))
            .unwrap_or(CellValue::Empty),
        CellValue::Text(record.aircraft.clone()),
        CellValue::Text(record.report_type.clone()),
        record
            .date
            .map(|d| CellValue::Number(datetime_to_excel_serial(&d)))
            .unwrap_or(CellValue::Empty),
        optional_text(&record.flight_number),
        optional_text(&record.departure),
        optional_text(&record.destination),
        optional_text(&record.report_id),
        optional_text(&record.status),
        CellValue::Number(record.similar_count as f64),
        CellValue::Text(record.original.clone()),
        CellValue::Text(record.translation.clone()),
    ]
}

pub fn translation_sheet(records: &[TranslationRecord]) -> Sheet {
    let mut sheet = Sheet::new(
        EXPORT_SHEET_NAME,
        TABULAR_COLUMNS.iter().map(|c| c.to_string()).collect(),
    );
    for record in records {
        sheet.push_row(record_cells(record));
    }
    sheet
}

/// Single-sheet `.xlsx` dump of the records.
pub fn export_spreadsheet(records: &[TranslationRecord]) -> Result<Vec<u8>> {
    write_workbook(&[translation_sheet(records)], &[COL_DATE])
        .map_err(|e| ReportError::export("spreadsheet", e))
}

/// Same columns as the spreadsheet, dates as `YYYY-MM-DD HH:MM:SS`.
pub fn export_csv(records: &[TranslationRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TABULAR_COLUMNS)?;
    for record in records {
        writer.write_record([
            record.row.map(|r| r.to_string()).unwrap_or_default(),
            record.aircraft.clone(),
            record.report_type.clone(),
            record
                .date
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            record.flight_number.clone().unwrap_or_default(),
            record.departure.clone().unwrap_or_default(),
            record.destination.clone().unwrap_or_default(),
            record.report_id.clone().unwrap_or_default(),
            record.status.clone().unwrap_or_default(),
            record.similar_count.to_string(),
            record.original.clone(),
            record.translation.clone(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::export("CSV file", e.error()))
}

fn raw_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(text) => text.clone(),
        other => other.as_text().unwrap_or_default(),
    }
}

fn count_value(cell: &CellValue) -> Option<usize> {
    match cell {
        CellValue::Number(n) if *n >= 0.0 => Some(n.round() as usize),
        CellValue::Text(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Reads a flat export back into records. `Aircraft`, `Type` and
/// `Translation` are required; other columns may be missing.
pub fn translation_records_from_sheet(sheet: &Sheet) -> Result<Vec<TranslationRecord>> {
    let index = |name: &str| sheet.headers.iter().position(|h| h.trim() == name);

    let missing: Vec<String> = [COL_AIRCRAFT, COL_TYPE, COL_TRANSLATION]
        .iter()
        .filter(|c| index(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ReportError::MissingColumns { columns: missing });
    }

    let cell = |row: &crate::domain::model::SheetRow, name: &str| -> CellValue {
        index(name)
            .map(|i| row.get(i).clone())
            .unwrap_or(CellValue::Empty)
    };

    Ok(sheet
        .rows
        .iter()
        .map(|row| TranslationRecord {
            row: count_value(&cell(row, COL_ROW)),
            aircraft: raw_text(&cell(row, COL_AIRCRAFT)),
            report_type: raw_text(&cell(row, COL_TYPE)),
            date: parse_timestamp(&cell(row, COL_DATE)),
            flight_number: cell(row, COL_FLIGHT).as_text(),
            departure: cell(row, COL_DEPARTURE).as_text(),
            destination: cell(row, COL_DESTINATION).as_text(),
            report_id: cell(row, COL_REPORT_ID).as_text(),
            status: cell(row, COL_STATUS).as_text(),
            similar_count: count_value(&cell(row, COL_SIMILAR_COUNT)).unwrap_or(0),
            original: raw_text(&cell(row, COL_ORIGINAL)),
            translation: raw_text(&cell(row, COL_TRANSLATION)),
        })
        .collect())
}

/// Re-imports a spreadsheet written by [`export_spreadsheet`].
pub fn read_translation_records(bytes: Vec<u8>) -> Result<Vec<TranslationRecord>> {
    let workbook = read_workbook(bytes)?;
    translation_records_from_sheet(workbook.sheet(None)?)
}
