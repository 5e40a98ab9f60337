use tracing::warn;

use crate::config::CoalesceRule;
use crate::error::ReconError;
use crate::table::{Cell, Table};

/// First present value, in priority order.
pub fn coalesce<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// Row-wise coalesce over the candidate columns that exist in `table`.
/// With no candidate present the result is all missing.
pub fn coalesce_columns(table: &Table, candidates: &[String]) -> Vec<Cell> {
    let indices: Vec<usize> = candidates
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();

    table
        .rows()
        .map(|row| coalesce(indices.iter().map(|&i| row[i].as_ref())).cloned())
        .collect()
}

/// Apply every rule against the table as it stood before any rule ran, then
/// write the targets. Returns the targets that had no candidate column.
pub fn apply_rules(table: &mut Table, rules: &[CoalesceRule]) -> Result<Vec<String>, ReconError> {
    let mut empty_targets = Vec::new();
    let mut computed = Vec::with_capacity(rules.len());

    for rule in rules {
        if !rule.candidates.iter().any(|c| table.has_column(c)) {
            warn!(target_column = %rule.target, "no candidate column present; target will be empty");
            empty_targets.push(rule.target.clone());
        }
        computed.push((rule.target.as_str(), coalesce_columns(table, &rule.candidates)));
    }

    for (target, values) in computed {
        table.set_column(target, values)?;
    }
    Ok(empty_targets)
}
