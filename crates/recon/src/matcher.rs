use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::error::ReconError;
use crate::loader::SourceTable;
use crate::table::Table;

/// Outcome of one left join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStats {
    /// Source rows whose key exists among the master's keys before the join.
    pub matched: usize,
    /// Source rows dropped from the lookup because an earlier row had the same key.
    pub duplicate_keys: usize,
    /// Names the source columns received in the master, in source order.
    pub columns: Vec<String>,
}

/// Left-join `source` onto `master`.
///
/// `master_keys[i]` is the lookup key of master row `i`; an empty key never
/// matches. The first source row per key wins, so the master keeps its row
/// count. Source columns whose name is already taken get `suffix`.
pub fn left_join(
    master: &mut Table,
    master_keys: &[String],
    source: &SourceTable,
    suffix: &str,
) -> Result<JoinStats, ReconError> {
    if master_keys.len() != master.len() {
        return Err(ReconError::ColumnLength {
            column: "<join keys>".into(),
            expected: master.len(),
            actual: master_keys.len(),
        });
    }
    let key_idx = source
        .table
        .column_index(&source.key_column)
        .ok_or_else(|| ReconError::MissingJoinKey {
            name: source.name.clone(),
            column: source.key_column.clone(),
        })?;

    let matched = count_matches(source.table.column_values(key_idx), master_keys);

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut duplicate_keys = 0;
    for (row, key) in source.table.column_values(key_idx).enumerate() {
        let Some(key) = key else { continue };
        match index.entry(key) {
            Entry::Occupied(_) => duplicate_keys += 1,
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }

    let hits: Vec<Option<usize>> = master_keys
        .iter()
        .map(|k| index.get(k.as_str()).copied())
        .collect();

    let mut taken: Vec<String> = master.headers().to_vec();
    let mut columns = Vec::with_capacity(source.table.width());
    for (col, header) in source.table.headers().iter().enumerate() {
        let name = unique_name(&taken, header, suffix);
        let values = hits
            .iter()
            .map(|hit| hit.and_then(|r| source.table.get(r, col)).map(String::from))
            .collect();
        master.set_column(&name, values)?;
        taken.push(name.clone());
        columns.push(name);
    }

    Ok(JoinStats {
        matched,
        duplicate_keys,
        columns,
    })
}

/// Count source keys present among `master_keys`. Every source row counts,
/// duplicates included.
pub fn count_matches<'a>(
    source_keys: impl Iterator<Item = Option<&'a str>>,
    master_keys: &[String],
) -> usize {
    let known: HashSet<&str> = master_keys
        .iter()
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .collect();
    source_keys
        .filter(|k| k.is_some_and(|k| known.contains(k)))
        .count()
}

/// Pick a column name not in `taken`: `name` itself, then `name + suffix`,
/// then `name + suffix + _2`, `_3`, ...
fn unique_name(taken: &[String], name: &str, suffix: &str) -> String {
    if !taken.iter().any(|t| t == name) {
        return name.to_string();
    }
    let base = format!("{name}{suffix}");
    if !taken.contains(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

/// Lookup keys for a master column taken as-is (already trimmed).
pub fn key_column(master: &Table, column: &str) -> Option<Vec<String>> {
    let values = master.column(column)?;
    Some(values.into_iter().map(|v| v.unwrap_or_default().to_string()).collect())
}

/// Lookup keys for a node-identifier column, normalized with [`normalize_node_id`].
pub fn node_id_keys(master: &Table, column: &str) -> Option<Vec<String>> {
    let values = master.column(column)?;
    Some(values.into_iter().map(normalize_node_id).collect())
}

/// Normalize a node identifier that may have been stored as a float.
///
/// `"1024.0"` → `"1024"`, `"abc"` → `"abc"`, missing or blank → `""`.
pub fn normalize_node_id(value: Option<&str>) -> String {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return String::new();
    };
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => {
            let t = n.trunc();
            if t == 0.0 {
                "0".to_string()
            } else {
                format!("{t:.0}")
            }
        }
        _ => raw.to_string(),
    }
}
