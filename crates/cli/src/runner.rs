//! `mlink run`: join, classify and summarize every partition of a
//! reporting day, writing the artifacts into each partition's `output`.

use std::path::PathBuf;

use meterlink_io::{load_partition, unexpected_files, IoError, LoadedSource};
use meterlink_recon::ageing::ageing_table;
use meterlink_recon::aggregate::rollup_table;
use meterlink_recon::model::AgeingReport;
use meterlink_recon::projection::MissingField;
use meterlink_recon::{PartitionReport, PipelineConfig, RunContext, StatusCounts};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::exit_codes::{EXIT_ERROR, EXIT_NO_PARTITIONS, EXIT_PARTITION_SKIPPED};
use crate::layout::{default_partitions, Artifacts, Partition, ReportLayout};
use crate::CliError;

/// Result of one partition, as printed by `--json`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ok {
        partition: String,
        total_records: usize,
        comm_status_overall: StatusCounts,
        artifacts: Vec<PathBuf>,
        diagnostics: Diagnostics,
    },
    Skipped {
        partition: String,
        reason: String,
    },
}

/// What a partition ran on and where it degraded without failing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub inputs: Vec<InputFiles>,
    pub missing_fields: Vec<MissingField>,
    pub empty_coalesce_targets: Vec<String>,
    pub ageing_excluded_non_comm: usize,
    pub ageing_excluded_never_comm: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputFiles {
    pub source: String,
    pub files: Vec<PathBuf>,
}

impl Diagnostics {
    pub fn with_ageing(mut self, ageing: &AgeingReport) -> Self {
        self.ageing_excluded_non_comm = ageing.excluded_non_comm;
        self.ageing_excluded_never_comm = ageing.excluded_never_comm;
        self
    }

    fn from_report(loaded: &[LoadedSource], report: &PartitionReport) -> Self {
        Diagnostics {
            inputs: loaded
                .iter()
                .map(|src| InputFiles {
                    source: src.name.clone(),
                    files: src.files.clone(),
                })
                .collect(),
            missing_fields: report.missing_fields.clone(),
            empty_coalesce_targets: report.empty_coalesce_targets.clone(),
            ..Diagnostics::default()
        }
        .with_ageing(&report.ageing)
    }
}

impl Outcome {
    pub fn skipped(partition: &str, reason: impl Into<String>) -> Self {
        Outcome::Skipped {
            partition: partition.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped { .. })
    }
}

pub fn cmd_run(
    config: &PipelineConfig,
    layout: &ReportLayout,
    filter: &[String],
    json: bool,
) -> Result<(), CliError> {
    let report_dir = layout.report_dir();
    std::fs::create_dir_all(&report_dir).map_err(|e| CliError::io(&report_dir, e))?;

    let mut partitions = layout
        .discover(filter)
        .map_err(|e| CliError::io(&report_dir, e))?;
    if partitions.is_empty() && filter.is_empty() {
        info!(dir = %report_dir.display(), "no partitions found; creating defaults");
        partitions = layout
            .scaffold(&default_partitions())
            .map_err(|e| CliError::io(&report_dir, e))?;
    }
    if partitions.is_empty() {
        return Err(no_partitions(layout, filter));
    }

    let outcomes: Vec<Outcome> = partitions
        .iter()
        .map(|p| match process_partition(config, layout, p) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(partition = %p.name, error = %e, "partition skipped");
                Outcome::skipped(&p.name, e.to_string())
            }
        })
        .collect();

    print_outcomes(&outcomes, json)?;
    finish(&outcomes)
}

fn process_partition(
    config: &PipelineConfig,
    layout: &ReportLayout,
    partition: &Partition,
) -> Result<Outcome, IoError> {
    let raw = partition.raw_data();
    if partition.has_no_inputs().map_err(|e| IoError::io(&raw, e))? {
        warn!(partition = %partition.name, dir = %raw.display(), "raw_data is empty; skipping");
        return Ok(Outcome::skipped(&partition.name, "no input files in raw_data"));
    }

    for name in unexpected_files(&raw, config)? {
        warn!(partition = %partition.name, file = %name, "unexpected file in raw_data");
    }

    info!(partition = %partition.name, "processing");
    let (inputs, loaded) = load_partition(&raw, config)?;
    let ctx = RunContext {
        processing_date: layout.date(),
        partition: partition.name.clone(),
    };
    let report = meterlink_recon::run(config, inputs, &ctx)?;
    let diagnostics = Diagnostics::from_report(&loaded, &report);

    let output = partition.output();
    std::fs::create_dir_all(&output).map_err(|e| IoError::io(&output, e))?;
    let artifacts = write_artifacts(config, &report, &partition.artifacts(&layout.date_str()))?;
    info!(partition = %partition.name, files = artifacts.len(), "artifacts written");

    Ok(Outcome::Ok {
        partition: partition.name.clone(),
        total_records: report.summary.total_records,
        comm_status_overall: report.summary.comm_status_overall,
        artifacts,
        diagnostics,
    })
}

fn write_artifacts(
    config: &PipelineConfig,
    report: &PartitionReport,
    artifacts: &Artifacts,
) -> Result<Vec<PathBuf>, IoError> {
    meterlink_io::csv::export(&report.master, &artifacts.master)?;
    meterlink_io::csv::export(&report.intermediate, &artifacts.intermediate)?;
    meterlink_io::csv::export(&report.classified.table, &artifacts.final_report)?;
    meterlink_io::json::export(&report.summary, &artifacts.summary)?;

    let mut written = vec![
        artifacts.master.clone(),
        artifacts.intermediate.clone(),
        artifacts.final_report.clone(),
        artifacts.summary.clone(),
    ];
    written.extend(write_summaries(config, &report.rollup, &report.ageing, artifacts)?);
    Ok(written)
}

/// Rollup always, ageing only when it has rows.
pub fn write_summaries(
    config: &PipelineConfig,
    rollup: &[meterlink_recon::model::RollupRow],
    ageing: &meterlink_recon::model::AgeingReport,
    artifacts: &Artifacts,
) -> Result<Vec<PathBuf>, IoError> {
    let mut written = Vec::with_capacity(2);
    meterlink_io::csv::export(&rollup_table(rollup, &config.rollup.levels), &artifacts.status_summary)?;
    written.push(artifacts.status_summary.clone());

    if ageing.rows.is_empty() {
        info!("no ageing rows; ageing analysis not written");
    } else {
        meterlink_io::csv::export(&ageing_table(ageing), &artifacts.ageing)?;
        written.push(artifacts.ageing.clone());
    }
    Ok(written)
}

pub fn no_partitions(layout: &ReportLayout, filter: &[String]) -> CliError {
    let dir = layout.report_dir();
    let message = if filter.is_empty() {
        format!("no partitions under {}", dir.display())
    } else {
        format!("no partitions named {} under {}", filter.join(", "), dir.display())
    };
    CliError::with_hint(
        EXIT_NO_PARTITIONS,
        message,
        "run `mlink init` to create the partition folders",
    )
}

pub fn print_outcomes(outcomes: &[Outcome], json: bool) -> Result<(), CliError> {
    if json {
        let text = serde_json::to_string_pretty(outcomes).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("failed to encode outcomes: {e}"),
            hint: None,
        })?;
        println!("{text}");
        return Ok(());
    }

    for outcome in outcomes {
        match outcome {
            Outcome::Ok {
                partition,
                total_records,
                comm_status_overall: c,
                artifacts,
                diagnostics: d,
            } => {
                println!(
                    "{partition}: {total_records} meters ({} communicating, {} non comm, {} never comm)",
                    c.communicating, c.non_comm, c.never_comm
                );
                for path in artifacts {
                    println!("  {}", path.display());
                }
                if !d.missing_fields.is_empty() {
                    let fields: Vec<&str> = d.missing_fields.iter().map(|m| m.field.as_str()).collect();
                    println!("  empty report columns: {}", fields.join(", "));
                }
                let excluded = d.ageing_excluded_non_comm + d.ageing_excluded_never_comm;
                if excluded > 0 {
                    println!("  meters without a computable age: {excluded}");
                }
            }
            Outcome::Skipped { partition, reason } => {
                println!("{partition}: skipped: {reason}");
            }
        }
    }
    Ok(())
}

/// Exit status for a list of outcomes.
pub fn finish(outcomes: &[Outcome]) -> Result<(), CliError> {
    let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
    if skipped == 0 {
        return Ok(());
    }
    Err(CliError::with_hint(
        EXIT_PARTITION_SKIPPED,
        format!("{skipped} of {} partitions skipped", outcomes.len()),
        "see the log for the reason of each skipped partition",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_json_shape() {
        let outcomes = vec![
            Outcome::Ok {
                partition: "DG1".into(),
                total_records: 3,
                comm_status_overall: StatusCounts {
                    communicating: 1,
                    never_comm: 1,
                    non_comm: 1,
                },
                artifacts: vec![PathBuf::from("out/Final_SLA_Report_2026-02-05.csv")],
                diagnostics: Diagnostics {
                    inputs: vec![InputFiles {
                        source: "Warehouse".into(),
                        files: vec![PathBuf::from("raw_data/Warehouse.csv")],
                    }],
                    missing_fields: vec![MissingField {
                        field: "Gateway ID".into(),
                        column: "Gateway ID".into(),
                    }],
                    empty_coalesce_targets: vec![],
                    ageing_excluded_non_comm: 0,
                    ageing_excluded_never_comm: 2,
                },
            },
            Outcome::skipped("DG2", "no input files in raw_data"),
        ];
        let value = serde_json::to_value(&outcomes).unwrap();
        assert_eq!(value[0]["status"], "ok");
        assert_eq!(value[0]["comm_status_overall"]["Never Comm"], 1);
        assert_eq!(value[0]["artifacts"][0], "out/Final_SLA_Report_2026-02-05.csv");
        let d = &value[0]["diagnostics"];
        assert_eq!(d["inputs"][0]["source"], "Warehouse");
        assert_eq!(d["missing_fields"][0]["field"], "Gateway ID");
        assert_eq!(d["ageing_excluded_never_comm"], 2);
        assert_eq!(value[1]["status"], "skipped");
        assert_eq!(value[1]["reason"], "no input files in raw_data");
    }

    #[test]
    fn skipped_partitions_set_exit_code() {
        assert!(finish(&[]).is_ok());
        let err = finish(&[Outcome::skipped("DG1", "x")]).unwrap_err();
        assert_eq!(err.code, EXIT_PARTITION_SKIPPED);
        assert_eq!(err.message, "1 of 1 partitions skipped");
    }
}
