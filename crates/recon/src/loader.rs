//! Source normalization: key presence check and key trimming.

use crate::config::SourceConfig;
use crate::error::ReconError;
use crate::table::Table;

/// A source table ready to be joined.
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub name: String,
    pub key_column: String,
    pub table: Table,
    /// Row count as loaded, before any join.
    pub row_count: usize,
}

/// Check the join key is present and trim every key cell. A key that trims
/// to nothing becomes missing and can never match.
pub fn normalize_source(source: &SourceConfig, mut table: Table) -> Result<SourceTable, ReconError> {
    if !table.has_column(&source.join_key) {
        return Err(ReconError::MissingJoinKey {
            name: source.name.clone(),
            column: source.join_key.clone(),
        });
    }

    table.map_column(&source.join_key, |cell| {
        cell.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    });

    Ok(SourceTable {
        name: source.name.clone(),
        key_column: source.join_key.clone(),
        row_count: table.len(),
        table,
    })
}

/// Expected columns of `source` that `headers` lacks, in descriptor order.
pub fn missing_columns(source: &SourceConfig, headers: &[String]) -> Vec<String> {
    source
        .columns
        .iter()
        .filter(|c| !headers.contains(c))
        .cloned()
        .collect()
}

/// Headers not in the descriptor's expected set.
pub fn extra_columns(source: &SourceConfig, headers: &[String]) -> Vec<String> {
    if source.columns.is_empty() {
        return Vec::new();
    }
    headers
        .iter()
        .filter(|h| !source.columns.contains(h))
        .cloned()
        .collect()
}

/// Fail when a present source lacks expected columns.
pub fn check_columns(source: &SourceConfig, headers: &[String]) -> Result<(), ReconError> {
    let missing = missing_columns(source, headers);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReconError::MissingColumns {
            name: source.name.clone(),
            columns: missing,
        })
    }
}
