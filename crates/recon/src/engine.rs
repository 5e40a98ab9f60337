use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::aggregate::build_rollup;
use crate::ageing::build_ageing;
use crate::classify::{classify_table, ClassifiedTable};
use crate::coalesce::apply_rules;
use crate::config::{PipelineConfig, SourceConfig};
use crate::error::ReconError;
use crate::loader::{check_columns, extra_columns, normalize_source, SourceTable};
use crate::matcher::{key_column, left_join, node_id_keys};
use crate::model::{AgeingReport, MatchStats, PartitionSummary, RollupRow, SourceMapping};
use crate::projection::{project, MissingField};
use crate::summary::build_summary;
use crate::table::Table;

/// Raw tables of one partition keyed by source name. Absent optional
/// sources are simply not in the map.
#[derive(Debug, Clone, Default)]
pub struct PartitionInputs {
    pub tables: HashMap<String, Table>,
}

impl PartitionInputs {
    pub fn insert(&mut self, source: &str, table: Table) {
        self.tables.insert(source.to_string(), table);
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub processing_date: NaiveDate,
    pub partition: String,
}

/// Everything one partition produces, ready to be written out.
#[derive(Debug, Clone)]
pub struct PartitionReport {
    /// Full-width joined master, before coalescing.
    pub master: Table,
    pub intermediate: Table,
    pub classified: ClassifiedTable,
    pub rollup: Vec<RollupRow>,
    pub ageing: AgeingReport,
    pub summary: PartitionSummary,
    pub missing_fields: Vec<MissingField>,
    pub empty_coalesce_targets: Vec<String>,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Sequential left-join of sources onto the base table.
pub struct Reconciler<'a> {
    config: &'a PipelineConfig,
    master: Table,
    mapping: Vec<MatchStats>,
}

impl<'a> Reconciler<'a> {
    /// Seed the master from the base source.
    pub fn seed(config: &'a PipelineConfig, base: SourceTable) -> Self {
        info!(source = %base.name, rows = base.row_count, "loaded base");
        let mapping = vec![MatchStats::base(&base.name, base.row_count)];
        Self {
            config,
            master: base.table,
            mapping,
        }
    }

    /// Merge one optional source. Returns `None` when the join was skipped
    /// because the master has no column to join on.
    pub fn merge(
        &mut self,
        descriptor: &SourceConfig,
        source: &SourceTable,
    ) -> Result<Option<MatchStats>, ReconError> {
        let keys = match &descriptor.join_on {
            Some(column) => match node_id_keys(&self.master, column) {
                Some(keys) => keys,
                None => {
                    warn!(source = %source.name, column = %column, "join column not in master; skipping merge");
                    return Ok(None);
                }
            },
            None => {
                let base_key = &self.config.base().join_key;
                key_column(&self.master, base_key).ok_or_else(|| ReconError::MissingColumn {
                    column: base_key.clone(),
                })?
            }
        };

        let suffix = descriptor.collision_suffix();
        let join = left_join(&mut self.master, &keys, source, &suffix)?;
        if join.duplicate_keys > 0 {
            warn!(
                source = %source.name,
                duplicates = join.duplicate_keys,
                "duplicate join keys; first row per key kept"
            );
        }
        debug!(source = %source.name, columns = ?join.columns, "merged columns");

        let stats = MatchStats::joined(&source.name, source.row_count, join.matched);
        info!(
            source = %source.name,
            total = stats.total,
            mapped = join.matched,
            unmapped = stats.total.saturating_sub(join.matched),
            "merged source"
        );
        self.mapping.push(stats.clone());
        Ok(Some(stats))
    }

    /// The master column `descriptor` joins on, when the master lacks it.
    pub fn missing_join_column<'d>(&self, descriptor: &'d SourceConfig) -> Option<&'d str> {
        descriptor
            .join_on
            .as_deref()
            .filter(|column| !self.master.has_column(column))
    }

    /// Log master coverage of node ids and routing info.
    pub fn log_coverage(&self) {
        let rows = self.master.len();
        let summary = &self.config.summary;
        for (what, column) in [
            ("node id", &summary.node_id_column),
            ("routing info", &summary.routing_column),
        ] {
            if let Some(missing) = self.master.null_count(column) {
                info!(missing, found = rows - missing, "meters without {what}");
            }
        }
    }

    pub fn finish(self) -> (Table, SourceMapping) {
        (self.master, SourceMapping(self.mapping))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn prepare(descriptor: &SourceConfig, table: Table) -> Result<SourceTable, ReconError> {
    check_columns(descriptor, table.headers())?;
    let extra = extra_columns(descriptor, table.headers());
    if !extra.is_empty() {
        warn!(source = %descriptor.name, columns = ?extra, "unexpected columns");
    }
    normalize_source(descriptor, table)
}

/// Run one partition through join, coalesce, projection, classification
/// and aggregation.
pub fn run(
    config: &PipelineConfig,
    mut inputs: PartitionInputs,
    ctx: &RunContext,
) -> Result<PartitionReport, ReconError> {
    let base = config.base();
    let base_table = inputs
        .tables
        .remove(&base.name)
        .ok_or_else(|| ReconError::MissingBase { name: base.name.clone() })?;

    let mut reconciler = Reconciler::seed(config, prepare(base, base_table)?);

    for descriptor in config.sources.iter().skip(1) {
        let Some(table) = inputs.tables.remove(&descriptor.name) else {
            info!(source = %descriptor.name, "source absent; skipped");
            continue;
        };
        if let Some(column) = reconciler.missing_join_column(descriptor) {
            warn!(source = %descriptor.name, column = %column, "join column not in master; skipping merge");
            continue;
        }
        let source = prepare(descriptor, table)?;
        reconciler.merge(descriptor, &source)?;
    }

    for name in inputs.tables.keys() {
        warn!(source = %name, "table supplied for unknown source; ignored");
    }

    reconciler.log_coverage();
    let (master, source_mapping) = reconciler.finish();

    let mut working = master.clone();
    let empty_coalesce_targets = apply_rules(&mut working, &config.coalesce)?;

    let projection = project(&working, &config.projection);
    let intermediate = projection.table;

    let classified = classify_table(intermediate.clone(), &config.status, ctx.processing_date)?;
    let counts = classified.counts();
    info!(
        partition = %ctx.partition,
        total = classified.len(),
        communicating = counts.communicating,
        non_comm = counts.non_comm,
        never_comm = counts.never_comm,
        "classified"
    );

    let rollup = build_rollup(&classified, &config.rollup.levels);
    let ageing = build_ageing(&classified, &config.status, ctx.processing_date);
    let summary = build_summary(
        ctx.processing_date,
        &ctx.partition,
        &master,
        &classified,
        source_mapping,
        config,
    );

    Ok(PartitionReport {
        master,
        intermediate,
        classified,
        rollup,
        ageing,
        summary,
        missing_fields: projection.missing,
        empty_coalesce_targets,
    })
}

/// Rebuild rollup and ageing from a previously written final report.
pub fn summarize_final(
    config: &PipelineConfig,
    final_table: Table,
    processing_date: NaiveDate,
) -> Result<(Vec<RollupRow>, AgeingReport), ReconError> {
    let classified = ClassifiedTable::from_final(final_table, &config.status.status_column)?;
    let rollup = build_rollup(&classified, &config.rollup.levels);
    let ageing = build_ageing(&classified, &config.status, processing_date);
    Ok((rollup, ageing))
}
