use serde::Serialize;
use tracing::warn;

use crate::config::ProjectionField;
use crate::table::Table;

/// Intermediate report table plus the fields that had no source column.
#[derive(Debug, Clone)]
pub struct Projection {
    pub table: Table,
    pub missing: Vec<MissingField>,
}

/// A projected field whose master column was absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingField {
    pub field: String,
    pub column: String,
}

/// Select and rename master columns into the external schema.
///
/// Output columns are always `fields` in order. A field whose column is not
/// in `master` is filled with empty strings.
pub fn project(master: &Table, fields: &[ProjectionField]) -> Projection {
    let headers: Vec<String> = fields.iter().map(|f| f.field.clone()).collect();
    let mut missing = Vec::new();

    let sources: Vec<Option<usize>> = fields
        .iter()
        .map(|f| {
            let idx = master.column_index(&f.column);
            if idx.is_none() {
                warn!(field = %f.field, column = %f.column, "column not found; filling with blanks");
                missing.push(MissingField {
                    field: f.field.clone(),
                    column: f.column.clone(),
                });
            }
            idx
        })
        .collect();

    let rows = master
        .rows()
        .map(|row| {
            sources
                .iter()
                .map(|src| match src {
                    Some(i) => row[*i].clone(),
                    None => Some(String::new()),
                })
                .collect()
        })
        .collect();

    Projection {
        table: Table::from_rows(headers, rows),
        missing,
    }
}
