//! Ageing histogram for meters that did not communicate on the processing date.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::classify::ClassifiedTable;
use crate::config::StatusConfig;
use crate::dates::parse_date;
use crate::model::{percentage, AgeingReport, AgeingRow, CommStatus};
use crate::table::Table;

/// Inclusive day range with its report label. `max` of `None` is open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBucket {
    pub label: &'static str,
    pub min: i64,
    pub max: Option<i64>,
}

pub const BUCKETS: [AgeBucket; 6] = [
    AgeBucket { label: "1-7 days", min: 1, max: Some(7) },
    AgeBucket { label: "8-15 days", min: 8, max: Some(15) },
    AgeBucket { label: "16-30 days", min: 16, max: Some(30) },
    AgeBucket { label: "31-60 days", min: 31, max: Some(60) },
    AgeBucket { label: "61-90 days", min: 61, max: Some(90) },
    AgeBucket { label: ">90 days", min: 91, max: None },
];

impl AgeBucket {
    pub fn contains(&self, age: i64) -> bool {
        age >= self.min && self.max.map_or(true, |max| age <= max)
    }
}

/// Bucket index for an age in days; ages below one day fall in no bucket.
pub fn bucket_for(age: i64) -> Option<usize> {
    BUCKETS.iter().position(|b| b.contains(age))
}

/// Whole calendar days from `since` to `processing_date`.
pub fn age_in_days(since: NaiveDate, processing_date: NaiveDate) -> i64 {
    (processing_date - since).num_days()
}

/// Build the histogram for Non Comm (age since last communication) and
/// Never Comm (age since installation) meters.
///
/// Nothing is produced when the timestamp column is absent. Never Comm is
/// only aged when the install-date column exists. Percentages are against
/// every record of the category, bucketed or not.
pub fn build_ageing(
    classified: &ClassifiedTable,
    status: &StatusConfig,
    processing_date: NaiveDate,
) -> AgeingReport {
    let table = &classified.table;
    let mut report = AgeingReport::default();

    let Some(comm_col) = table.column_index(&status.timestamp_field) else {
        info!(column = %status.timestamp_field, "timestamp column absent; no ageing report");
        return report;
    };

    let (rows, excluded) = age_category(classified, CommStatus::NonComm, comm_col, processing_date);
    report.rows.extend(rows);
    report.excluded_non_comm = excluded;

    match status.install_field().and_then(|f| table.column_index(f)) {
        Some(install_col) => {
            let (rows, excluded) =
                age_category(classified, CommStatus::NeverComm, install_col, processing_date);
            report.rows.extend(rows);
            report.excluded_never_comm = excluded;
        }
        None => info!("install date column absent; Never Comm meters not aged"),
    }

    report
}

fn age_category(
    classified: &ClassifiedTable,
    category: CommStatus,
    date_col: usize,
    processing_date: NaiveDate,
) -> (Vec<AgeingRow>, usize) {
    let members: Vec<usize> = classified
        .statuses
        .iter()
        .enumerate()
        .filter(|(_, s)| **s == category)
        .map(|(row, _)| row)
        .collect();
    if members.is_empty() {
        return (Vec::new(), 0);
    }

    let mut counts = [0usize; BUCKETS.len()];
    let mut excluded = 0;
    for &row in &members {
        let bucket = classified
            .table
            .get(row, date_col)
            .and_then(parse_date)
            .and_then(|d| bucket_for(age_in_days(d, processing_date)));
        match bucket {
            Some(i) => counts[i] += 1,
            None => excluded += 1,
        }
    }

    if excluded > 0 {
        warn!(
            category = %category,
            excluded,
            total = members.len(),
            "records with no computable age left out of the ageing buckets"
        );
    }

    let rows = BUCKETS
        .iter()
        .zip(counts)
        .map(|(bucket, count)| AgeingRow {
            category,
            bucket: bucket.label,
            count,
            percentage: percentage(count, members.len()),
        })
        .collect();
    (rows, excluded)
}

/// Flat table form of the ageing rows for CSV output.
pub fn ageing_table(report: &AgeingReport) -> Table {
    let mut table = Table::new(vec![
        "Category".into(),
        "Age Bucket".into(),
        "Count".into(),
        "Percentage".into(),
    ]);
    for row in &report.rows {
        table.push_row(vec![
            Some(row.category.label().to_string()),
            Some(row.bucket.to_string()),
            Some(row.count.to_string()),
            Some(format!("{:.2}", row.percentage)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn classified(rows: &[(CommStatus, Option<&str>, Option<&str>)]) -> ClassifiedTable {
        let table = Table::from_rows(
            vec!["Communicated At".into(), "Installation date".into()],
            rows.iter()
                .map(|(_, c, i)| vec![c.map(String::from), i.map(String::from)])
                .collect(),
        );
        ClassifiedTable {
            table,
            statuses: rows.iter().map(|r| r.0).collect(),
        }
    }

    #[test]
    fn bucket_edges_are_inclusive() {
        assert_eq!(bucket_for(0), None);
        assert_eq!(bucket_for(-3), None);
        assert_eq!(BUCKETS[bucket_for(1).unwrap()].label, "1-7 days");
        assert_eq!(BUCKETS[bucket_for(7).unwrap()].label, "1-7 days");
        assert_eq!(BUCKETS[bucket_for(8).unwrap()].label, "8-15 days");
        assert_eq!(BUCKETS[bucket_for(90).unwrap()].label, "61-90 days");
        assert_eq!(BUCKETS[bucket_for(91).unwrap()].label, ">90 days");
        assert_eq!(BUCKETS[bucket_for(5000).unwrap()].label, ">90 days");
    }

    #[test]
    fn non_comm_aged_from_last_communication() {
        let today = day("2026-02-05");
        let data = classified(&[
            (CommStatus::NonComm, Some("04-02-2026 23:00:00"), None),
            (CommStatus::NonComm, Some("28-01-2026 10:00:00"), None),
            (CommStatus::NonComm, Some("01-10-2025"), None),
            (CommStatus::Communicating, Some("05-02-2026"), None),
        ]);
        let report = build_ageing(&data, &StatusConfig::default(), today);

        assert_eq!(report.rows.len(), BUCKETS.len());
        assert!(report.rows.iter().all(|r| r.category == CommStatus::NonComm));
        let counts: Vec<usize> = report.rows.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0, 1]);
        assert_eq!(report.rows[0].percentage, 33.33);
        assert_eq!(report.excluded_non_comm, 0);
    }

    #[test]
    fn never_comm_aged_from_installation() {
        let today = day("2026-02-05");
        let data = classified(&[
            (CommStatus::NeverComm, None, Some("2026-01-20")),
            (CommStatus::NeverComm, None, None),
        ]);
        let report = build_ageing(&data, &StatusConfig::default(), today);

        assert_eq!(report.rows.len(), BUCKETS.len());
        assert_eq!(report.rows[2].bucket, "16-30 days");
        assert_eq!(report.rows[2].count, 1);
        assert_eq!(report.rows[2].percentage, 50.0);
        assert_eq!(report.excluded_never_comm, 1);
    }

    #[test]
    fn future_and_same_day_dates_are_excluded() {
        let today = day("2026-02-05");
        let data = classified(&[
            (CommStatus::NonComm, Some("10-02-2026"), None),
            (CommStatus::NonComm, Some("garbage"), None),
        ]);
        let report = build_ageing(&data, &StatusConfig::default(), today);
        assert_eq!(report.excluded_non_comm, 2);
        assert!(report.rows.iter().all(|r| r.count == 0));
    }

    #[test]
    fn no_timestamp_column_no_rows() {
        let table = Table::from_rows(vec!["Installation date".into()], vec![vec![Some("2026-01-01".into())]]);
        let data = ClassifiedTable { table, statuses: vec![CommStatus::NeverComm] };
        let report = build_ageing(&data, &StatusConfig::default(), day("2026-02-05"));
        assert!(report.rows.is_empty());
    }

    #[test]
    fn never_comm_skipped_without_install_column() {
        let table = Table::from_rows(vec!["Communicated At".into()], vec![vec![None]]);
        let data = ClassifiedTable { table, statuses: vec![CommStatus::NeverComm] };
        let report = build_ageing(&data, &StatusConfig::default(), day("2026-02-05"));
        assert!(report.rows.is_empty());
        assert_eq!(report.excluded_never_comm, 0);
    }

    #[test]
    fn never_comm_ageing_can_be_turned_off() {
        let data = classified(&[(CommStatus::NeverComm, None, Some("2026-01-20"))]);
        let status = StatusConfig {
            install_field: Some(String::new()),
            ..StatusConfig::default()
        };
        let report = build_ageing(&data, &status, day("2026-02-05"));
        assert!(report.rows.is_empty());
        assert_eq!(report.excluded_never_comm, 0);
    }

    #[test]
    fn table_layout() {
        let data = classified(&[(CommStatus::NonComm, Some("01-02-2026"), None)]);
        let report = build_ageing(&data, &StatusConfig::default(), day("2026-02-05"));
        let t = ageing_table(&report);
        assert_eq!(t.headers(), &["Category", "Age Bucket", "Count", "Percentage"]);
        assert_eq!(
            t.row(0).unwrap(),
            &[
                Some("Non Comm".to_string()),
                Some("1-7 days".to_string()),
                Some("1".to_string()),
                Some("100.00".to_string())
            ]
        );
    }

    proptest! {
        #[test]
        fn every_positive_age_has_one_bucket(age in 1i64..100_000) {
            let hits = BUCKETS.iter().filter(|b| b.contains(age)).count();
            prop_assert_eq!(hits, 1);
        }
    }
}
