use chrono::NaiveDate;
use flyone_report::adapters::translator::PassthroughTranslator;
use flyone_report::adapters::AcceptMachine;
use flyone_report::core::session::ReportSession;
use flyone_report::core::translation::TranslationAdapter;
use flyone_report::domain::category::{Category, CategoryMap};
use flyone_report::domain::model::{columns, CellValue, DateRange, GroupOrder, Sheet, Workbook};
use flyone_report::export::CategoryIndex;
use std::sync::Arc;

fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

fn workbook(rows: &[(&str, &str, &str)]) -> Workbook {
    let mut sheet = Sheet::new(
        "Reports",
        vec![
            columns::AIRCRAFT.to_string(),
            columns::REPORT_TYPE.to_string(),
            columns::EVENT_TIME.to_string(),
            columns::DETAILS.to_string(),
        ],
    );
    for (aircraft, report_type, time) in rows {
        sheet.push_row(vec![
            text(aircraft),
            text(report_type),
            text(time),
            text("details"),
        ]);
    }
    Workbook {
        sheets: vec![sheet],
    }
}

fn march() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    )
    .unwrap()
}

#[test]
fn test_boundary_days_are_included() {
    let book = workbook(&[
        ("EK-001", "Technical", "2025-02-28 23:59:59"),
        ("EK-001", "Technical", "2025-03-01 00:00:00"),
        ("EK-002", "Catering", "2025-03-31 23:59:59"),
        ("EK-002", "Catering", "2025-04-01 00:00:00"),
        ("EK-003", "Cleaning", "not a date"),
    ]);

    let session = ReportSession::open(&book, None, march()).unwrap();
    let rows: Vec<usize> = session.filtered.rows.iter().map(|r| r.row.number).collect();
    assert_eq!(rows, vec![3, 4]);
}

#[test]
fn test_grouping_is_deterministic() {
    let book = workbook(&[
        ("EK-002", "Technical", "2025-03-05 10:00"),
        ("EK-001", "Technical", "2025-03-02 10:00"),
        ("EK-001", "Catering", "2025-03-03 10:00"),
        ("EK-002", "Technical", "2025-03-09 10:00"),
    ]);
    let session = ReportSession::open(&book, None, march()).unwrap();

    let first = session.group(GroupOrder::TypeAircraft).unwrap();
    let second = session.group(GroupOrder::TypeAircraft).unwrap();
    assert_eq!(first, second);

    let sizes: Vec<(String, String, usize)> = first
        .groups
        .iter()
        .map(|g| (g.key.report_type.clone(), g.key.aircraft.clone(), g.similar_count()))
        .collect();
    assert_eq!(
        sizes,
        vec![
            ("Catering".to_string(), "EK-001".to_string(), 1),
            ("Technical".to_string(), "EK-001".to_string(), 1),
            ("Technical".to_string(), "EK-002".to_string(), 2),
        ]
    );

    // same membership, different order
    let reversed = session.group(GroupOrder::AircraftType).unwrap();
    assert_eq!(reversed.record_count(), first.record_count());
    let keys: Vec<(&str, &str)> = reversed
        .groups
        .iter()
        .map(|g| g.key.ordered(GroupOrder::AircraftType))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("EK-001", "Catering"),
            ("EK-001", "Technical"),
            ("EK-002", "Technical"),
        ]
    );
}

#[tokio::test]
async fn test_category_totals_match_tables() {
    let book = workbook(&[
        ("EK-001", "Technical", "2025-03-02 10:00"),
        ("EK-002", "Technical", "2025-03-03 10:00"),
        ("EK-001", "Technical", "2025-03-04 10:00"),
        ("EK-001", "Catering", "2025-03-05 10:00"),
        ("EK-009", "Bird strike", "2025-03-06 10:00"),
    ]);
    let session = ReportSession::open(&book, None, march()).unwrap();
    let adapter = TranslationAdapter::new(Box::new(PassthroughTranslator));
    let result = session
        .translate(GroupOrder::TypeAircraft, &adapter, Arc::new(AcceptMachine))
        .await
        .unwrap();

    let categories = CategoryMap::default();
    let index = CategoryIndex::build(&result.records, &categories);
    assert_eq!(index.total(), result.records.len());
    assert_eq!(index.sections.len(), Category::ALL.len());

    for section in &index.sections {
        let table_rows: usize = section.tables.iter().map(|t| t.records.len()).sum();
        assert_eq!(section.total(), table_rows);
    }

    let technical = index.section(Category::Technical).unwrap();
    assert_eq!(technical.total(), 3);
    assert_eq!(technical.tables.len(), 2);
    assert_eq!(index.section(Category::Flight).unwrap().total(), 0);
    assert_eq!(index.section(Category::Other).unwrap().total(), 1);
}
