use std::collections::BTreeMap;

use crate::classify::ClassifiedTable;
use crate::model::{percentage, CommStatus, RollupRow, StatusCounts};
use crate::table::Table;

/// Hierarchical status rollup: "Overall", then every distinct value of each
/// level, outermost level first, values ascending.
///
/// Enclosing levels of a row are the mode of that column within the row's
/// partition rather than a strict parent lookup.
pub fn build_rollup(classified: &ClassifiedTable, levels: &[String]) -> Vec<RollupRow> {
    let table = &classified.table;
    let mut rows = Vec::new();

    let all: Vec<usize> = (0..classified.len()).collect();
    rows.push(rollup_row("Overall".into(), vec![String::new(); levels.len()], classified, &all));

    let level_idx: Vec<Option<usize>> = levels.iter().map(|l| table.column_index(l)).collect();

    for (depth, level) in levels.iter().enumerate() {
        let Some(col) = level_idx[depth] else { continue };

        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, value) in table.column_values(col).enumerate() {
            if let Some(v) = non_blank(value) {
                groups.entry(v).or_default().push(row);
            }
        }

        for (value, members) in groups {
            let mut labels = vec![String::new(); levels.len()];
            for (outer, slot) in labels.iter_mut().enumerate().take(depth) {
                if let Some(outer_col) = level_idx[outer] {
                    *slot = mode(members.iter().map(|&r| table.get(r, outer_col)));
                }
            }
            labels[depth] = value.to_string();
            rows.push(rollup_row(format!("By {level}"), labels, classified, &members));
        }
    }

    rows
}

fn rollup_row(
    category: String,
    levels: Vec<String>,
    classified: &ClassifiedTable,
    members: &[usize],
) -> RollupRow {
    let counts = StatusCounts::from_statuses(members.iter().map(|&r| &classified.statuses[r]));
    let total = members.len();
    RollupRow {
        category,
        levels,
        counts,
        total,
        communicating_pct: percentage(counts.communicating, total),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Most frequent non-blank value; ties go to the smallest value, no values
/// gives an empty string.
pub fn mode<'a>(values: impl Iterator<Item = Option<&'a str>>) -> String {
    let mut freq: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.filter_map(non_blank) {
        *freq.entry(v).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in freq {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string()).unwrap_or_default()
}

/// Flat table form of the rollup for CSV output.
pub fn rollup_table(rows: &[RollupRow], levels: &[String]) -> Table {
    let mut headers = vec!["Category".to_string()];
    headers.extend(levels.iter().cloned());
    headers.extend(CommStatus::ALL.iter().map(|s| s.label().to_string()));
    headers.push("Total".into());
    headers.push("Communicating %".into());

    let mut table = Table::new(headers);
    for r in rows {
        let mut cells = vec![Some(r.category.clone())];
        cells.extend(r.levels.iter().map(|l| Some(l.clone())));
        cells.extend(CommStatus::ALL.iter().map(|s| Some(r.counts.get(*s).to_string())));
        cells.push(Some(r.total.to_string()));
        cells.push(Some(format!("{:.2}", r.communicating_pct)));
        table.push_row(cells);
    }
    table
}
