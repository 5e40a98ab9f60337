use chrono::NaiveDate;

use crate::config::StatusConfig;
use crate::dates::parse_date;
use crate::error::ReconError;
use crate::model::{parse_status, CommStatus, StatusCounts};
use crate::table::Table;

/// Status of one meter given its last-communicated date.
pub fn classify(last_seen: Option<NaiveDate>, processing_date: NaiveDate) -> CommStatus {
    match last_seen {
        None => CommStatus::NeverComm,
        Some(d) if d == processing_date => CommStatus::Communicating,
        Some(_) => CommStatus::NonComm,
    }
}

/// Status from a raw cell: missing, blank and unparseable all mean never communicated.
pub fn classify_cell(value: Option<&str>, processing_date: NaiveDate) -> CommStatus {
    classify(value.and_then(parse_date), processing_date)
}

/// Final report table with one status per row.
#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    pub table: Table,
    pub statuses: Vec<CommStatus>,
}

impl ClassifiedTable {
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts::from_statuses(&self.statuses)
    }

    /// Rebuild from a previously written final report, reading the status
    /// labels back from `status_column`.
    pub fn from_final(table: Table, status_column: &str) -> Result<Self, ReconError> {
        let values = table.column(status_column).ok_or_else(|| ReconError::MissingColumn {
            column: status_column.into(),
        })?;
        let statuses = values
            .into_iter()
            .enumerate()
            .map(|(row, v)| parse_status(row, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { table, statuses })
    }
}

/// Append the status and blank remarks columns to the intermediate table.
pub fn classify_table(
    mut table: Table,
    status: &StatusConfig,
    processing_date: NaiveDate,
) -> Result<ClassifiedTable, ReconError> {
    let statuses: Vec<CommStatus> = match table.column(&status.timestamp_field) {
        Some(values) => values
            .into_iter()
            .map(|v| classify_cell(v, processing_date))
            .collect(),
        None => vec![CommStatus::NeverComm; table.len()],
    };

    let labels = statuses.iter().map(|s| Some(s.label().to_string())).collect();
    table.set_column(&status.status_column, labels)?;
    table.set_column(&status.remarks_column, vec![Some(String::new()); table.len()])?;

    Ok(ClassifiedTable { table, statuses })
}
