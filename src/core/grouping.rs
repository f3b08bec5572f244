//! Partition filtered rows by (report type, aircraft) and attach group sizes.
//!
//! ```text
//! filtered rows                    groups (type-aircraft order)
//! ┌──────────────────────────┐     ┌──────────────────────────────┐
//! │ Technical  EK-001  row 2 │     │ (Catering, EK-002)   size 1  │
//! │ Catering   EK-002  row 3 │  →  ├──────────────────────────────┤
//! │ Technical  EK-001  row 5 │     │ (Technical, EK-001)  size 2  │
//! └──────────────────────────┘     └──────────────────────────────┘
//! ```
//!
//! Groups come out in ascending key order for the configured [`GroupOrder`];
//! rows inside a group keep their sheet order.

use crate::core::filter::{DatedRow, FilteredRows};
use crate::domain::model::{columns, GroupKey, GroupOrder, ReportRecord};
use crate::utils::error::{ReportError, Result};
use std::collections::BTreeMap;

pub const REQUIRED_GROUP_COLUMNS: [&str; 2] = [columns::AIRCRAFT, columns::REPORT_TYPE];

#[derive(Debug, Clone, PartialEq)]
pub struct ReportGroup {
    pub key: GroupKey,
    pub records: Vec<ReportRecord>,
}

impl ReportGroup {
    pub fn similar_count(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub order: GroupOrder,
    pub groups: Vec<ReportGroup>,
    /// rows dropped because aircraft or report type was blank
    pub skipped_rows: usize,
}

impl Grouping {
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    /// Every record paired with its group's similar count, in group order.
    pub fn records_with_counts(&self) -> impl Iterator<Item = (&ReportRecord, usize)> {
        self.groups
            .iter()
            .flat_map(|g| g.records.iter().map(move |r| (r, g.similar_count())))
    }
}

struct ColumnIndex {
    aircraft: usize,
    report_type: usize,
    details: Option<usize>,
    flight_number: Option<usize>,
    departure: Option<usize>,
    destination: Option<usize>,
    report_id: Option<usize>,
    status: Option<usize>,
}

impl ColumnIndex {
    fn resolve(filtered: &FilteredRows) -> Result<Self> {
        let missing: Vec<String> = REQUIRED_GROUP_COLUMNS
            .iter()
            .filter(|c| filtered.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ReportError::MissingColumns { columns: missing });
        }

        let details = filtered.column_index(columns::DETAILS);
        if details.is_none() {
            tracing::warn!(
                "⚠️ '{}' column not found, report texts will be empty",
                columns::DETAILS
            );
        }

        Ok(Self {
            aircraft: filtered.column_index(columns::AIRCRAFT).unwrap_or_default(),
            report_type: filtered
                .column_index(columns::REPORT_TYPE)
                .unwrap_or_default(),
            details,
            flight_number: filtered.column_index(columns::FLIGHT_NUMBER),
            departure: filtered.column_index(columns::DEPARTURE),
            destination: filtered.column_index(columns::DESTINATION),
            report_id: filtered.column_index(columns::REPORT_ID),
            status: filtered.column_index(columns::STATUS),
        })
    }

    fn optional(row: &DatedRow, index: Option<usize>) -> Option<String> {
        index.and_then(|i| row.row.get(i).as_text())
    }

    fn record(&self, row: &DatedRow) -> Option<ReportRecord> {
        let aircraft = row.row.get(self.aircraft).as_text()?;
        let report_type = row.row.get(self.report_type).as_text()?;
        Some(ReportRecord {
            row: row.row.number,
            aircraft,
            report_type,
            timestamp: row.timestamp,
            flight_number: Self::optional(row, self.flight_number),
            departure: Self::optional(row, self.departure),
            destination: Self::optional(row, self.destination),
            report_id: Self::optional(row, self.report_id),
            details: Self::optional(row, self.details).unwrap_or_default(),
            status: Self::optional(row, self.status),
        })
    }
}

/// Builds report records and groups them. Fails before grouping when a
/// required column is missing.
pub fn group_reports(filtered: &FilteredRows, order: GroupOrder) -> Result<Grouping> {
    let index = ColumnIndex::resolve(filtered)?;

    let mut buckets: BTreeMap<(String, String), ReportGroup> = BTreeMap::new();
    let mut skipped_rows = 0usize;

    for row in &filtered.rows {
        let Some(record) = index.record(row) else {
            skipped_rows += 1;
            continue;
        };
        let key = record.key();
        let (first, second) = key.ordered(order);
        let sort_key = (first.to_string(), second.to_string());
        buckets
            .entry(sort_key)
            .or_insert_with(|| ReportGroup {
                key,
                records: Vec::new(),
            })
            .records
            .push(record);
    }

    if skipped_rows > 0 {
        tracing::warn!(
            "⚠️ {} row(s) skipped: blank '{}' or '{}'",
            skipped_rows,
            columns::AIRCRAFT,
            columns::REPORT_TYPE
        );
    }

    let groups: Vec<ReportGroup> = buckets.into_values().collect();
    tracing::debug!("Grouped {} rows into {} groups", filtered.len(), groups.len());

    Ok(Grouping {
        order,
        groups,
        skipped_rows,
    })
}
