use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use meterlink_io::{load_partition, unexpected_files};
use meterlink_recon::{run, CommStatus, PipelineConfig, RunContext};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

const WAREHOUSE: &str = "Meter Serial No,Feeder Name(From Field),Consumer Name,Address,Mobile Number,Latitude,Longitude,Installed Sub Division,Division,Circle,Installation date
M001,F1,Alice,Addr1,9000000001,22.1,88.1,SD-A,Div-1,North,20-01-2026
M002,F2,Bob,Addr2,9000000002,22.2,88.2,SD-A,Div-1,North,10-01-2026
M003,F3,Carol,Addr3,9000000003,22.3,88.3,SD-B,Div-2,South,01-12-2025
";

fn write_xlsx(path: &Path, rows: &[&[&str]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            // Numeric-looking cells go in as numbers, the way exports store them.
            match value.parse::<f64>() {
                Ok(n) if r > 0 => sheet.write_number(r as u32, c as u16, n).unwrap(),
                _ => sheet.write_string(r as u32, c as u16, *value).unwrap(),
            };
        }
    }
    workbook.save(path).unwrap();
}

fn routing_header() -> &'static [&'static str] {
    &["Node ID", "Gateway ID", "Hop Count", "Sink ID", "Communicated At", "Source Endpoint"]
}

#[test]
fn loads_workbooks_and_runs_partition() {
    let dir = tempdir().unwrap();
    let raw = dir.path();
    fs::write(raw.join("Warehouse.csv"), WAREHOUSE).unwrap();
    write_xlsx(
        &raw.join("Node ID.xlsx"),
        &[&["Meter Number", "NodeId"], &["M001", "1024"], &["M002", "2048"]],
    );
    write_xlsx(
        &raw.join("Routings Part-1.xlsx"),
        &[routing_header(), &["1024", "GW-1", "2", "S1", "05-02-2026 07:30:00", "EP1"]],
    );
    write_xlsx(
        &raw.join("Routings Part-2.xlsx"),
        &[
            routing_header(),
            &["1024", "GW-1", "2", "S1", "05-02-2026 07:30:00", "EP1"],
            &["2048", "GW-2", "3", "S1", "01-02-2026 10:00:00", "EP2"],
        ],
    );

    let config = PipelineConfig::builtin().unwrap();
    let (inputs, loaded) = load_partition(raw, &config).unwrap();
    let names: Vec<&str> = loaded.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Warehouse", "Node_ID", "Routings"]);
    let routings = loaded.iter().find(|l| l.name == "Routings").unwrap();
    assert_eq!(routings.files.len(), 2);

    let ctx = RunContext {
        processing_date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
        partition: "DG1".into(),
    };
    let report = run(&config, inputs, &ctx).unwrap();

    let mapping = &report.summary.missing_data_summary.source_mapping;
    // The duplicate routing row across parts is dropped before matching.
    let routing = mapping.get("Routings").unwrap();
    assert_eq!((routing.total, routing.matched), (2, Some(2)));
    assert_eq!(
        report.classified.statuses,
        vec![CommStatus::Communicating, CommStatus::NonComm, CommStatus::NeverComm]
    );
    assert!(unexpected_files(raw, &config).unwrap().is_empty());
}

#[test]
fn workbook_missing_expected_column_fails() {
    let dir = tempdir().unwrap();
    let raw = dir.path();
    fs::write(raw.join("Warehouse.csv"), WAREHOUSE).unwrap();
    write_xlsx(&raw.join("Node ID.xlsx"), &[&["Meter Number"], &["M001"]]);

    let config = PipelineConfig::builtin().unwrap();
    let (inputs, _) = load_partition(raw, &config).unwrap();
    let ctx = RunContext {
        processing_date: NaiveDate::from_ymd_opt(2026, 2, 5).unwrap(),
        partition: "DG1".into(),
    };
    let err = run(&config, inputs, &ctx).unwrap_err();
    assert!(err.to_string().contains("NodeId"));
}
