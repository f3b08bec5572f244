use crate::core::normalize::NormalizedSheet;
use crate::domain::model::{DateRange, SheetRow};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct DatedRow {
    pub row: SheetRow,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredRows {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<DatedRow>,
}

impl FilteredRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Keeps rows whose event day lies inside the inclusive range. Rows without a
/// readable timestamp are dropped.
pub fn filter_by_date(sheet: NormalizedSheet, range: &DateRange) -> FilteredRows {
    let total = sheet.rows.len();
    let rows: Vec<DatedRow> = sheet
        .rows
        .into_iter()
        .filter_map(|r| match r.timestamp {
            Some(timestamp) if range.contains(&timestamp) => Some(DatedRow {
                row: r.row,
                timestamp,
            }),
            _ => None,
        })
        .collect();

    tracing::debug!(
        "Date filter {}..={} kept {} of {} rows",
        range.start,
        range.end,
        rows.len(),
        total
    );

    FilteredRows {
        sheet_name: sheet.name,
        headers: sheet.headers,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::normalize::NormalizedRow;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
    }

    fn sheet(timestamps: Vec<Option<NaiveDateTime>>) -> NormalizedSheet {
        NormalizedSheet {
            name: "Reports".to_string(),
            headers: vec!["Date & Time of Event (UTC)".to_string()],
            rows: timestamps
                .into_iter()
                .enumerate()
                .map(|(i, timestamp)| NormalizedRow {
                    row: SheetRow {
                        number: i + 2,
                        cells: vec![],
                    },
                    timestamp,
                })
                .collect(),
        }
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        )
        .unwrap();

        let filtered = filter_by_date(
            sheet(vec![at(4, 23), at(5, 0), at(7, 12), at(10, 23), at(11, 0)]),
            &range,
        );

        let numbers: Vec<usize> = filtered.rows.iter().map(|r| r.row.number).collect();
        assert_eq!(numbers, vec![3, 4, 5]);
    }

    #[test]
    fn test_missing_timestamps_are_excluded() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        )
        .unwrap();

        let filtered = filter_by_date(sheet(vec![None, at(2, 8), None]), &range);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows[0].row.number, 3);
    }

    #[test]
    fn test_nothing_in_range_is_empty() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();

        let filtered = filter_by_date(sheet(vec![at(2, 8)]), &range);
        assert!(filtered.is_empty());
    }
}
