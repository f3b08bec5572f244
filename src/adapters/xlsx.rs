//! Minimal `.xlsx` reader: sheet names, shared strings and cell values.
//! Formatting, formulas and merged cells are ignored; only the cached cell
//! values are read.

use crate::domain::model::{CellValue, DateSystem, Sheet, SheetRow, Workbook};
use crate::export::ooxml::PackageReader;
use crate::utils::error::{ReportError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Last column Excel allows (XFD).
const MAX_COLUMN_INDEX: usize = 16_383;

fn attribute(element: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == local_name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn xml_reader(xml: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    reader
}

/// Decodes the `_xHHHH_` escapes Excel writes for control characters.
/// `_x005F_` escapes a literal underscore, so `_x005F_x000D_` stays
/// `_x000D_`.
struct EscapeDecoder {
    pattern: Regex,
}

impl EscapeDecoder {
    fn new() -> Result<Self> {
        let pattern = Regex::new(r"_x([0-9A-Fa-f]{4})_")
            .map_err(|e| ReportError::workbook(format!("invalid escape pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    fn decode(&self, text: String) -> String {
        if !text.contains("_x") {
            return text;
        }
        self.pattern
            .replace_all(&text, |caps: &Captures| {
                u32::from_str_radix(&caps[1], 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

struct SheetList {
    /// `(name, relationship id)` in workbook order
    sheets: Vec<(String, String)>,
    date_system: DateSystem,
}

fn is_true(value: &str) -> bool {
    matches!(value.trim(), "1" | "true")
}

fn read_sheet_list(xml: &[u8]) -> Result<SheetList> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut date_system = DateSystem::Excel1900;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"workbookPr" => {
                if attribute(&e, b"date1904")?.is_some_and(|v| is_true(&v)) {
                    date_system = DateSystem::Excel1904;
                }
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attribute(&e, b"name")?.unwrap_or_default();
                let id = attribute(&e, b"id")?
                    .ok_or_else(|| ReportError::workbook(format!("sheet '{}' has no r:id", name)))?;
                sheets.push((name, id));
            }
            _ => {}
        }
    }

    Ok(SheetList {
        sheets,
        date_system,
    })
}

fn read_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    rels.insert(id, target);
                }
            }
            _ => {}
        }
    }

    Ok(rels)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn read_shared_strings(xml: &[u8], escapes: &EscapeDecoder) -> Result<Vec<String>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text && !in_phonetic => current.push_str(&t.unescape()?),
            Event::CData(t) if in_text && !in_phonetic => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()))
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(escapes.decode(std::mem::take(&mut current))),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            _ => {}
        }
    }

    Ok(strings)
}

/// "AB12" → 27. `None` when the reference has no letters or lies past XFD.
pub fn column_index(reference: &str) -> Option<usize> {
    let mut number = 0usize;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        number = number.checked_mul(26)?.checked_add(digit)?;
        if number > MAX_COLUMN_INDEX + 1 {
            return None;
        }
    }
    number.checked_sub(1)
}

#[derive(Default)]
struct CellState {
    column: usize,
    cell_type: Option<String>,
    value: String,
    inline: String,
}

impl CellState {
    fn into_value(self, shared: &[String], escapes: &EscapeDecoder) -> CellValue {
        match self.cell_type.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .map(|s| CellValue::Text(s.clone()))
                .unwrap_or(CellValue::Empty),
            Some("inlineStr") => CellValue::Text(escapes.decode(self.inline)),
            Some("str") => CellValue::Text(escapes.decode(self.value)),
            Some("d") => CellValue::Text(self.value),
            Some("b") => CellValue::Bool(self.value.trim() == "1"),
            Some("e") => CellValue::Empty,
            _ if self.value.trim().is_empty() => CellValue::Empty,
            _ => match self.value.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(self.value),
            },
        }
    }
}

fn read_sheet_rows(
    xml: &[u8],
    shared: &[String],
    escapes: &EscapeDecoder,
) -> Result<BTreeMap<usize, Vec<CellValue>>> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut rows: BTreeMap<usize, Vec<CellValue>> = BTreeMap::new();

    let mut current_row = 0usize;
    let mut cells: Vec<CellValue> = Vec::new();
    let mut cell: Option<CellState> = None;
    let mut in_value = false;
    let mut in_inline_text = false;
    let mut in_phonetic = false;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    current_row = attribute(&e, b"r")?
                        .and_then(|r| r.parse().ok())
                        .unwrap_or(current_row + 1);
                    cells = Vec::new();
                }
                b"c" => {
                    let column = match attribute(&e, b"r")? {
                        Some(reference) => column_index(&reference).ok_or_else(|| {
                            ReportError::workbook(format!(
                                "invalid cell reference '{}' in row {}",
                                reference, current_row
                            ))
                        })?,
                        None if cells.len() > MAX_COLUMN_INDEX => {
                            return Err(ReportError::workbook(format!(
                                "row {} has more than {} columns",
                                current_row,
                                MAX_COLUMN_INDEX + 1
                            )))
                        }
                        None => cells.len(),
                    };
                    cell = Some(CellState {
                        column,
                        cell_type: attribute(&e, b"t")?,
                        ..CellState::default()
                    });
                }
                b"v" => in_value = true,
                b"t" => in_inline_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                current_row = attribute(&e, b"r")?
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(current_row + 1);
            }
            Event::Text(t) => {
                if let Some(state) = cell.as_mut() {
                    if in_value {
                        state.value.push_str(&t.unescape()?);
                    } else if in_inline_text && !in_phonetic {
                        state.inline.push_str(&t.unescape()?);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"rPh" => in_phonetic = false,
                b"c" => {
                    if let Some(state) = cell.take() {
                        let column = state.column;
                        let value = state.into_value(shared, escapes);
                        if cells.len() <= column {
                            cells.resize(column + 1, CellValue::Empty);
                        }
                        cells[column] = value;
                    }
                }
                b"row" => {
                    rows.insert(current_row, std::mem::take(&mut cells));
                }
                _ => {}
            },
            _ => {}
        }
    }

    Ok(rows)
}

fn header_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(text) => text.clone(),
        other => other.as_text().unwrap_or_default(),
    }
}

fn build_sheet(
    name: String,
    rows: BTreeMap<usize, Vec<CellValue>>,
    date_system: DateSystem,
) -> Sheet {
    let mut iter = rows
        .into_iter()
        .filter(|(_, cells)| cells.iter().any(|c| !c.is_empty()));

    let Some((_, header_cells)) = iter.next() else {
        let mut sheet = Sheet::new(name, Vec::new());
        sheet.date_system = date_system;
        return sheet;
    };

    let mut sheet = Sheet::new(name, header_cells.iter().map(header_text).collect());
    sheet.date_system = date_system;
    sheet.rows = iter
        .map(|(number, cells)| SheetRow { number, cells })
        .collect();
    sheet
}

/// Reads every worksheet of an `.xlsx` file held in memory.
pub fn read_workbook(bytes: Vec<u8>) -> Result<Workbook> {
    let mut package = PackageReader::new(bytes)
        .map_err(|e| ReportError::workbook(format!("not an .xlsx package: {}", e)))?;

    let escapes = EscapeDecoder::new()?;
    let SheetList {
        sheets: sheet_list,
        date_system,
    } = read_sheet_list(&package.read_part(WORKBOOK_PART)?)?;
    if date_system == DateSystem::Excel1904 {
        tracing::debug!("Workbook uses the 1904 date system");
    }
    let rels = read_relationships(&package.read_part(WORKBOOK_RELS_PART)?)?;
    let shared = match package.read_optional(SHARED_STRINGS_PART)? {
        Some(xml) => read_shared_strings(&xml, &escapes)?,
        None => Vec::new(),
    };

    let mut sheets = Vec::with_capacity(sheet_list.len());
    for (name, id) in sheet_list {
        let target = rels.get(&id).ok_or_else(|| {
            ReportError::workbook(format!("sheet '{}' points to unknown relationship {}", name, id))
        })?;
        let part = resolve_target(target);
        let rows = read_sheet_rows(&package.read_part(&part)?, &shared, &escapes)?;
        let sheet = build_sheet(name, rows, date_system);
        tracing::debug!(
            "Read sheet '{}' with {} columns and {} data rows",
            sheet.name,
            sheet.headers.len(),
            sheet.rows.len()
        );
        sheets.push(sheet);
    }

    Ok(Workbook { sheets })
}
