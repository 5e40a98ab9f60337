//! `mlink summarize`: rebuild the status rollup and ageing analysis from
//! final reports already on disk, without re-running the joins.

use meterlink_io::IoError;
use meterlink_recon::{summarize_final, PipelineConfig};
use tracing::{error, info, warn};

use crate::layout::{Partition, ReportLayout};
use crate::runner::{finish, no_partitions, print_outcomes, write_summaries, Diagnostics, Outcome};
use crate::CliError;

pub fn cmd_summarize(
    config: &PipelineConfig,
    layout: &ReportLayout,
    filter: &[String],
    json: bool,
) -> Result<(), CliError> {
    let partitions = layout
        .discover(filter)
        .map_err(|e| CliError::io(&layout.report_dir(), e))?;
    if partitions.is_empty() {
        return Err(no_partitions(layout, filter));
    }

    let outcomes: Vec<Outcome> = partitions
        .iter()
        .map(|p| match summarize_partition(config, layout, p) {
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

fn summarize_partition(
    config: &PipelineConfig,
    layout: &ReportLayout,
    partition: &Partition,
) -> Result<Outcome, IoError> {
    let artifacts = partition.artifacts(&layout.date_str());
    if !artifacts.final_report.is_file() {
        warn!(partition = %partition.name, file = %artifacts.final_report.display(), "final report not found");
        return Ok(Outcome::skipped(
            &partition.name,
            format!("{} not found", artifacts.final_report.display()),
        ));
    }

    let table = meterlink_io::csv::import(&artifacts.final_report)?;
    let (rollup, ageing) = summarize_final(config, table, layout.date())?;
    let written = write_summaries(config, &rollup, &ageing, &artifacts)?;

    let (total_records, counts) = rollup
        .first()
        .map(|overall| (overall.total, overall.counts))
        .unwrap_or_default();
    info!(partition = %partition.name, total = total_records, "summaries rebuilt");

    Ok(Outcome::Ok {
        partition: partition.name.clone(),
        total_records,
        comm_status_overall: counts,
        artifacts: written,
        diagnostics: Diagnostics::default().with_ageing(&ageing),
    })
}
