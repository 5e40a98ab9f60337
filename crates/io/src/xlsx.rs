// Excel import (xlsx, xls, xlsb, ods) for source extracts

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use meterlink_recon::{Cell, Table};

use crate::error::IoError;

/// Import the first worksheet. The first row holds the headers; fully
/// empty rows are skipped.
pub fn import(path: &Path) -> Result<Table, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(IoError::NoSheets { path: path.to_path_buf() });
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::Workbook {
            path: path.to_path_buf(),
            message: format!("failed to read sheet '{sheet_name}': {e}"),
        })?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(row) => row
            .iter()
            .enumerate()
            .map(|(i, cell)| cell_text(cell).unwrap_or_else(|| format!("Unnamed: {i}")))
            .collect(),
        None => return Ok(Table::default()),
    };

    let body: Vec<Vec<Cell>> = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<Cell>>())
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    Ok(Table::from_rows(headers, body))
}

/// Render one cell the way the extract's consumers expect to see it.
pub fn cell_text(cell: &Data) -> Cell {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{}", n))
            }
        }
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Some(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            // Assumes the 1900 date system, as most workbooks use.
            let serial = dt.as_f64();
            Some(match serial_to_datetime(serial) {
                Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
                None => format!("{}", serial),
            })
        }
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Largest serial Excel can display as a date (9999-12-31 23:59:59).
const MAX_SERIAL: f64 = 2_958_465.999_99;

/// Convert an Excel serial date (1900 system) to a timestamp, rounded to the
/// nearest second. Serials outside Excel's date range give `None`.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
    use tempfile::tempdir;

    #[test]
    fn test_serial_conversion() {
        let dt = serial_to_datetime(46058.5).unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2026-02-05 12:00:00");
        assert!(serial_to_datetime(f64::NAN).is_none());
        assert!(serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn test_serial_out_of_date_range() {
        assert!(serial_to_datetime(1.0e12).is_none());
        assert!(serial_to_datetime(f64::MAX).is_none());
        assert!(serial_to_datetime(2_958_466.0).is_none());
        let last = serial_to_datetime(2_958_465.0).unwrap();
        assert_eq!(last.format("%Y-%m-%d").to_string(), "9999-12-31");
    }

    #[test]
    fn test_import_huge_date_cell_keeps_serial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Routings Part-1.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let format = Format::new().set_num_format("dd-mm-yyyy hh:mm:ss");
        sheet.write_string(0, 0, "Communicated At").unwrap();
        sheet.write_number_with_format(1, 0, 1.0e12, &format).unwrap();
        workbook.save(&path).unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, 0), Some("1000000000000"));
    }

    #[test]
    fn test_float_cells_without_fraction() {
        assert_eq!(cell_text(&Data::Float(1024.0)), Some("1024".to_string()));
        assert_eq!(cell_text(&Data::Float(22.75)), Some("22.75".to_string()));
        assert_eq!(cell_text(&Data::String(String::new())), None);
        assert_eq!(cell_text(&Data::Bool(true)), Some("TRUE".to_string()));
    }

    #[test]
    fn test_import_first_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Node ID.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Meter Number").unwrap();
        sheet.write_string(0, 1, "NodeId").unwrap();
        sheet.write_string(1, 0, "M001").unwrap();
        sheet.write_number(1, 1, 1024.0).unwrap();
        sheet.write_string(2, 0, "M002").unwrap();
        let other = workbook.add_worksheet();
        other.write_string(0, 0, "ignored").unwrap();
        workbook.save(&path).unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.headers(), &["Meter Number", "NodeId"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, 1), Some("1024"));
        assert_eq!(table.get(1, 1), None);
    }

    #[test]
    fn test_import_dates_as_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Routings.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let format = Format::new().set_num_format("dd-mm-yyyy hh:mm:ss");
        sheet.write_string(0, 0, "Node ID").unwrap();
        sheet.write_string(0, 1, "Communicated At").unwrap();
        sheet.write_number(1, 0, 1024.0).unwrap();
        let when = ExcelDateTime::from_ymd(2026, 2, 5).unwrap().and_hms(7, 30, 0).unwrap();
        sheet.write_datetime_with_format(1, 1, &when, &format).unwrap();
        workbook.save(&path).unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.get(0, 0), Some("1024"));
        assert_eq!(table.get(0, 1), Some("2026-02-05 07:30:00"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let err = import(&dir.path().join("nope.xlsx")).unwrap_err();
        assert!(matches!(err, IoError::Workbook { .. }));
    }
}
