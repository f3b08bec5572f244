//! Categorized `.docx` report: one section per category, one table per
//! aircraft inside it.

use crate::domain::category::{Category, CategoryMap};
use crate::domain::model::{DateRange, SchemaVersion, TranslationRecord};
use crate::export::ooxml::{
    content_types, relationships, PackageReader, PackageWriter, XmlBuilder, NS_RELATIONSHIPS,
    REL_OFFICE_DOCUMENT, REL_STYLES,
};
use crate::utils::error::{ReportError, Result};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use std::collections::BTreeSet;

const DOCUMENT_PART: &str = "word/document.xml";
const NS_WORDPROCESSING: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const DOCUMENT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";

/// Report title above the first section.
pub const DOCUMENT_TITLE: &str = "Զեկույցների ցանկ";

/// A4 text width in twentieths of a point.
const TABLE_WIDTH: u32 = 9638;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Arial" w:eastAsia="Arial"/><w:sz w:val="20"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="80"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="26"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="120" w:after="60"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:i/><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/><w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/></w:tblBorders><w:tblCellMar><w:left w:w="80" w:type="dxa"/><w:right w:w="80" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#;

/// Records of one aircraft inside a category, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftTable<'a> {
    pub aircraft: &'a str,
    pub records: Vec<&'a TranslationRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySection<'a> {
    pub category: Category,
    pub tables: Vec<AircraftTable<'a>>,
}

impl CategorySection<'_> {
    pub fn total(&self) -> usize {
        self.tables.iter().map(|t| t.records.len()).sum()
    }
}

/// category → aircraft → records. Every category is present, in document
/// order, even when it has no records.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryIndex<'a> {
    pub sections: Vec<CategorySection<'a>>,
}

impl<'a> CategoryIndex<'a> {
    pub fn build(records: &'a [TranslationRecord], categories: &CategoryMap) -> Self {
        let mut sections: Vec<CategorySection<'a>> = Category::ALL
            .iter()
            .map(|&category| CategorySection {
                category,
                tables: Vec::new(),
            })
            .collect();

        for record in records {
            let category = categories.classify(&record.report_type);
            let Some(section) = sections.iter_mut().find(|s| s.category == category) else {
                continue;
            };
            let aircraft = record.aircraft.as_str();
            match section.tables.iter_mut().find(|t| t.aircraft == aircraft) {
                Some(table) => table.records.push(record),
                None => section.tables.push(AircraftTable {
                    aircraft,
                    records: vec![record],
                }),
            }
        }

        Self { sections }
    }

    pub fn section(&self, category: Category) -> Option<&CategorySection<'a>> {
        self.sections.iter().find(|s| s.category == category)
    }

    pub fn total(&self) -> usize {
        self.sections.iter().map(CategorySection::total).sum()
    }
}

/// Column headers for the document tables.
pub fn table_headers(schema: SchemaVersion) -> &'static [&'static str] {
    match schema {
        SchemaVersion::V1 => &["Օդանավ", "Չվերթ", "Ամսաթիվ", "Նկարագրություն"],
        SchemaVersion::V2 => &[
            "Օդանավ",
            "Զեկույցի համար",
            "Նկարագրություն",
            "Ամսաթիվ",
            "Երթուղի",
            "Նմանատիպ",
            "Կարգավիճակ",
        ],
    }
}

pub fn table_row(record: &TranslationRecord, schema: SchemaVersion) -> Vec<String> {
    let text = record.translation.trim().to_string();
    match schema {
        SchemaVersion::V1 => vec![
            record.aircraft.clone(),
            record.flight_number.clone().unwrap_or_default(),
            record.date_display(),
            text,
        ],
        SchemaVersion::V2 => vec![
            record.aircraft.clone(),
            record.report_id.clone().unwrap_or_default(),
            text,
            record.date_display(),
            record.route(),
            record.similar_count.to_string(),
            record.status.clone().unwrap_or_default(),
        ],
    }
}

/// Relative column widths; the description column gets the most room.
fn column_widths(schema: SchemaVersion) -> Vec<u32> {
    let weights: &[u32] = match schema {
        SchemaVersion::V1 => &[2, 2, 2, 6],
        SchemaVersion::V2 => &[2, 2, 6, 2, 2, 1, 2],
    };
    let sum: u32 = weights.iter().sum();
    weights.iter().map(|w| TABLE_WIDTH * w / sum).collect()
}

fn paragraph(xml: &mut XmlBuilder, style: Option<&str>, text: &str, bold: bool) -> Result<()> {
    xml.start("w:p", &[])?;
    if let Some(style) = style {
        xml.start("w:pPr", &[])?;
        xml.empty("w:pStyle", &[("w:val", style)])?;
        xml.end("w:pPr")?;
    }
    xml.start("w:r", &[])?;
    if bold {
        xml.start("w:rPr", &[])?;
        xml.empty("w:b", &[])?;
        xml.end("w:rPr")?;
    }
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            xml.empty("w:br", &[])?;
        }
        xml.text_element("w:t", &[("xml:space", "preserve")], line)?;
    }
    xml.end("w:r")?;
    xml.end("w:p")?;
    Ok(())
}

fn table_cell(xml: &mut XmlBuilder, width: u32, text: &str, bold: bool) -> Result<()> {
    let width = width.to_string();
    xml.start("w:tc", &[])?;
    xml.start("w:tcPr", &[])?;
    xml.empty("w:tcW", &[("w:w", width.as_str()), ("w:type", "dxa")])?;
    xml.end("w:tcPr")?;
    paragraph(xml, None, text, bold)?;
    xml.end("w:tc")?;
    Ok(())
}

fn aircraft_table(
    xml: &mut XmlBuilder,
    table: &AircraftTable<'_>,
    schema: SchemaVersion,
) -> Result<()> {
    let widths = column_widths(schema);
    let total_width = TABLE_WIDTH.to_string();

    xml.start("w:tbl", &[])?;
    xml.start("w:tblPr", &[])?;
    xml.empty("w:tblStyle", &[("w:val", "TableGrid")])?;
    xml.empty("w:tblW", &[("w:w", total_width.as_str()), ("w:type", "dxa")])?;
    xml.end("w:tblPr")?;

    xml.start("w:tblGrid", &[])?;
    for width in &widths {
        let width = width.to_string();
        xml.empty("w:gridCol", &[("w:w", width.as_str())])?;
    }
    xml.end("w:tblGrid")?;

    xml.start("w:tr", &[])?;
    xml.start("w:trPr", &[])?;
    xml.empty("w:tblHeader", &[])?;
    xml.end("w:trPr")?;
    for (header, width) in table_headers(schema).iter().zip(&widths) {
        table_cell(xml, *width, header, true)?;
    }
    xml.end("w:tr")?;

    for record in &table.records {
        xml.start("w:tr", &[])?;
        for (value, width) in table_row(record, schema).iter().zip(&widths) {
            table_cell(xml, *width, value, false)?;
        }
        xml.end("w:tr")?;
    }

    xml.end("w:tbl")?;
    Ok(())
}

fn write_section(
    xml: &mut XmlBuilder,
    section: &CategorySection<'_>,
    schema: SchemaVersion,
) -> Result<()> {
    let header = format!("{} {}", section.category.display_title(), section.total());
    paragraph(xml, Some("Heading1"), &header, false)?;
    for table in &section.tables {
        paragraph(xml, Some("Heading2"), table.aircraft, false)?;
        aircraft_table(xml, table, schema)?;
        // Word merges adjacent tables without a paragraph between them.
        paragraph(xml, None, "", false)?;
    }
    Ok(())
}

fn section_fragment(section: &CategorySection<'_>, schema: SchemaVersion) -> Result<Vec<u8>> {
    let mut xml = XmlBuilder::new();
    write_section(&mut xml, section, schema)?;
    Ok(xml.into_bytes())
}

fn range_line(range: &DateRange) -> String {
    format!(
        "{} - {}",
        range.start.format("%d.%m.%Y"),
        range.end.format("%d.%m.%Y")
    )
}

fn generated_document_xml(
    index: &CategoryIndex<'_>,
    range: &DateRange,
    schema: SchemaVersion,
) -> Result<Vec<u8>> {
    let mut xml = XmlBuilder::new();
    xml.declaration()?;
    xml.start(
        "w:document",
        &[("xmlns:w", NS_WORDPROCESSING), ("xmlns:r", NS_RELATIONSHIPS)],
    )?;
    xml.start("w:body", &[])?;

    paragraph(&mut xml, Some("Title"), DOCUMENT_TITLE, false)?;
    paragraph(&mut xml, None, &range_line(range), false)?;
    for section in &index.sections {
        write_section(&mut xml, section, schema)?;
    }

    xml.start("w:sectPr", &[])?;
    xml.empty("w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
    xml.empty(
        "w:pgMar",
        &[
            ("w:top", "1134"),
            ("w:right", "1134"),
            ("w:bottom", "1134"),
            ("w:left", "1134"),
            ("w:header", "708"),
            ("w:footer", "708"),
            ("w:gutter", "0"),
        ],
    )?;
    xml.end("w:sectPr")?;

    xml.end("w:body")?;
    xml.end("w:document")?;
    Ok(xml.into_bytes())
}

fn generated_package(
    index: &CategoryIndex<'_>,
    range: &DateRange,
    schema: SchemaVersion,
) -> Result<Vec<u8>> {
    let mut package = PackageWriter::new();
    package.add(
        "[Content_Types].xml",
        content_types(
            &[],
            &[
                ("/word/document.xml", DOCUMENT_CONTENT_TYPE),
                ("/word/styles.xml", STYLES_CONTENT_TYPE),
            ],
        )?,
    );
    package.add(
        "_rels/.rels",
        relationships(&[("rId1", REL_OFFICE_DOCUMENT, DOCUMENT_PART)])?,
    );
    package.add(
        "word/_rels/document.xml.rels",
        relationships(&[("rId1", REL_STYLES, "styles.xml")])?,
    );
    package.add(DOCUMENT_PART, generated_document_xml(index, range, schema)?);
    package.add("word/styles.xml", STYLES_XML.as_bytes().to_vec());
    package.finish()
}

/// Replaces each paragraph whose text contains a `{{category}}` anchor with
/// that category's section. Paragraph text is joined across runs, so anchors
/// split by Word's run boundaries are still found.
fn fill_template_body(
    document: &[u8],
    index: &CategoryIndex<'_>,
    schema: SchemaVersion,
) -> Result<Vec<u8>> {
    let anchors: Vec<(String, &CategorySection<'_>)> = index
        .sections
        .iter()
        .map(|s| (s.category.anchor(), s))
        .collect();

    let mut reader = Reader::from_reader(document);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();

    let mut pending: Vec<Event<'static>> = Vec::new();
    let mut paragraph_text = String::new();
    let mut paragraph_depth = 0usize;
    let mut in_text = false;
    let mut found: BTreeSet<String> = BTreeSet::new();

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf)?;
        match &event {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == b"w:p" => paragraph_depth += 1,
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Text(t) if in_text && paragraph_depth > 0 => {
                paragraph_text.push_str(&t.unescape()?)
            }
            _ => {}
        }

        if paragraph_depth == 0 {
            writer.write_event(event)?;
            continue;
        }

        let closes_paragraph = matches!(&event, Event::End(e) if e.name().as_ref() == b"w:p");
        pending.push(event.into_owned());
        if !closes_paragraph {
            continue;
        }
        paragraph_depth -= 1;
        if paragraph_depth > 0 {
            continue;
        }

        match anchors
            .iter()
            .find(|(anchor, _)| paragraph_text.contains(anchor.as_str()))
        {
            Some((anchor, section)) => {
                found.insert(anchor.clone());
                let fragment = section_fragment(section, schema)?;
                writer.get_mut().extend_from_slice(&fragment);
                pending.clear();
            }
            None => {
                for event in pending.drain(..) {
                    writer.write_event(event)?;
                }
            }
        }
        paragraph_text.clear();
    }

    if let Some((anchor, _)) = anchors.iter().find(|(anchor, _)| !found.contains(anchor)) {
        return Err(ReportError::TemplateAnchorMissing {
            anchor: anchor.clone(),
        });
    }

    Ok(writer.into_inner())
}

fn templated_package(
    template: Vec<u8>,
    index: &CategoryIndex<'_>,
    schema: SchemaVersion,
) -> Result<Vec<u8>> {
    let mut reader = PackageReader::new(template)?;
    let entries = reader.entries()?;
    if !entries.iter().any(|(name, _)| name == DOCUMENT_PART) {
        return Err(ReportError::export(
            "Word document",
            "template has no word/document.xml",
        ));
    }

    let mut package = PackageWriter::new();
    for (name, data) in entries {
        if name == DOCUMENT_PART {
            package.add(name, fill_template_body(&data, index, schema)?);
        } else {
            package.add(name, data);
        }
    }
    package.finish()
}

/// Builds the whole `.docx` in memory. With a template, its anchor paragraphs
/// are replaced; otherwise a plain document is generated.
pub fn compose_document(
    records: &[TranslationRecord],
    range: &DateRange,
    schema: SchemaVersion,
    categories: &CategoryMap,
    template: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let index = CategoryIndex::build(records, categories);
    for section in &index.sections {
        tracing::debug!(
            "📂 {}: {} reports, {} aircraft",
            section.category,
            section.total(),
            section.tables.len()
        );
    }

    let composed = match template {
        Some(template) => templated_package(template, &index, schema),
        None => generated_package(&index, range, schema),
    };

    composed.map_err(|e| match e {
        ReportError::TemplateAnchorMissing { .. } | ReportError::ExportError { .. } => e,
        other => ReportError::export("Word document", other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(aircraft: &str, report_type: &str, translation: &str) -> TranslationRecord {
        TranslationRecord {
            row: Some(2),
            aircraft: aircraft.to_string(),
            report_type: report_type.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 4)
                .unwrap()
                .and_hms_opt(9, 30, 0),
            flight_number: Some("3F 101".to_string()),
            departure: Some("EVN".to_string()),
            destination: Some("MXP".to_string()),
            report_id: Some("TR-17".to_string()),
            status: Some("Open".to_string()),
            similar_count: 1,
            original: "original".to_string(),
            translation: translation.to_string(),
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap()
    }

    fn document_text(bytes: Vec<u8>) -> String {
        let mut reader = PackageReader::new(bytes).unwrap();
        String::from_utf8(reader.read_part(DOCUMENT_PART).unwrap()).unwrap()
    }

    fn template(body: &str) -> Vec<u8> {
        let mut package = PackageWriter::new();
        package.add("[Content_Types].xml", b"<Types/>".to_vec());
        package.add(
            DOCUMENT_PART,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}"><w:body>{}<w:sectPr/></w:body></w:document>"#,
                NS_WORDPROCESSING, body
            )
            .into_bytes(),
        );
        package.finish().unwrap()
    }

    fn all_anchor_paragraphs() -> String {
        Category::ALL
            .iter()
            .map(|c| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", c.anchor()))
            .collect()
    }

    #[test]
    fn test_index_keeps_every_category_and_first_seen_aircraft() {
        let records = vec![
            record("EK-002", "Technical", "a"),
            record("EK-001", "Technical", "b"),
            record("EK-002", "Technical", "c"),
            record("EK-003", "Catering", "d"),
            record("EK-004", "Something new", "e"),
        ];
        let index = CategoryIndex::build(&records, &CategoryMap::default());

        assert_eq!(index.sections.len(), Category::ALL.len());
        let technical = index.section(Category::Technical).unwrap();
        let aircraft: Vec<&str> = technical.tables.iter().map(|t| t.aircraft).collect();
        assert_eq!(aircraft, vec!["EK-002", "EK-001"]);
        assert_eq!(technical.total(), 3);
        assert_eq!(technical.tables[0].records.len(), 2);

        assert_eq!(index.section(Category::Catering).unwrap().total(), 1);
        assert_eq!(index.section(Category::Other).unwrap().total(), 1);
        assert_eq!(index.section(Category::Cleaning).unwrap().total(), 0);
        assert_eq!(index.total(), records.len());
    }

    #[test]
    fn test_translated_text_does_not_drive_classification() {
        let records = vec![record("EK-001", "Catering", "Տեխնիկական խնդիր")];
        let index = CategoryIndex::build(&records, &CategoryMap::default());
        assert_eq!(index.section(Category::Technical).unwrap().total(), 0);
        assert_eq!(index.section(Category::Catering).unwrap().total(), 1);
    }

    #[test]
    fn test_table_rows_per_schema() {
        let mut r = record("EK-001", "Technical", "  Արտահոսք  ");
        assert_eq!(
            table_row(&r, SchemaVersion::V1),
            vec!["EK-001", "3F 101", "2025-03-04 09:30", "Արտահոսք"]
        );
        assert_eq!(
            table_row(&r, SchemaVersion::V2),
            vec![
                "EK-001",
                "TR-17",
                "Արտահոսք",
                "2025-03-04 09:30",
                "3F 101 / EVN-MXP",
                "1",
                "Open"
            ]
        );

        r.date = None;
        r.report_id = None;
        r.status = None;
        let row = table_row(&r, SchemaVersion::V2);
        assert_eq!(row[1], "");
        assert_eq!(row[3], "");
        assert_eq!(row[6], "");
        assert_eq!(table_headers(SchemaVersion::V2).len(), row.len());
    }

    #[test]
    fn test_generated_document_lists_every_section() {
        let records = vec![
            record("EK-001", "Technical", "first"),
            record("EK-001", "Technical", "second"),
        ];
        let bytes = compose_document(
            &records,
            &range(),
            SchemaVersion::V2,
            &CategoryMap::default(),
            None,
        )
        .unwrap();
        let xml = document_text(bytes);

        assert!(xml.contains("Տեխնիկական զեկույցներ՝ 2"));
        assert!(xml.contains("Սննդի սպասարկման վերաբերյալ զեկույցներ՝ 0"));
        assert!(xml.contains("Այլ խնդիրներ՝ 0"));
        assert!(xml.contains("01.03.2025 - 31.03.2025"));
        assert_eq!(xml.matches("<w:tbl>").count(), 1);
        assert!(xml.find("first").unwrap() < xml.find("second").unwrap());
    }

    #[test]
    fn test_template_anchor_replaced() {
        let body = format!(
            "<w:p><w:r><w:t>Intro</w:t></w:r></w:p>{}",
            all_anchor_paragraphs().replace(
                "<w:t>{{catering}}</w:t>",
                "<w:t>{{cater</w:t></w:r><w:r><w:t>ing}}</w:t>"
            )
        );
        let records = vec![record("EK-002", "Catering", "Սնունդը սառն էր")];
        let bytes = compose_document(
            &records,
            &range(),
            SchemaVersion::V1,
            &CategoryMap::default(),
            Some(template(&body)),
        )
        .unwrap();
        let xml = document_text(bytes);

        assert!(xml.contains("Intro"));
        assert!(!xml.contains("{{"));
        assert!(xml.contains("Սննդի սպասարկման վերաբերյալ զեկույցներ՝ 1"));
        assert!(xml.contains("Սնունդը սառն էր"));
        assert!(xml.contains("<w:sectPr/>"));
    }

    #[test]
    fn test_template_missing_anchor() {
        let body = all_anchor_paragraphs().replace("{{other}}", "nothing here");
        let result = compose_document(
            &[],
            &range(),
            SchemaVersion::V2,
            &CategoryMap::default(),
            Some(template(&body)),
        );
        match result {
            Err(ReportError::TemplateAnchorMissing { anchor }) => assert_eq!(anchor, "{{other}}"),
            other => panic!("expected TemplateAnchorMissing, got {:?}", other.map(|b| b.len())),
        }
    }

    #[test]
    fn test_broken_template_is_export_error() {
        let result = compose_document(
            &[],
            &range(),
            SchemaVersion::V2,
            &CategoryMap::default(),
            Some(b"not a zip".to_vec()),
        );
        assert!(matches!(result, Err(ReportError::ExportError { .. })));
    }
}
