//! Column-ordered in-memory table used by every pipeline stage.
//!
//! Cells are `Option<String>`: `None` is a missing value (empty field, empty
//! spreadsheet cell, or a left-join miss). Headers are stored exactly as
//! read; trailing whitespace in a header is significant.

use std::collections::HashSet;

use crate::error::ReconError;

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Build a table from raw rows. Short rows are padded with `None`, long
    /// rows are truncated to the header width.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Values of one column by index, top to bottom.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows.iter().map(move |r| r.get(col).and_then(|c| c.as_deref()))
    }

    /// Values of a named column, or `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Some(self.column_values(idx).collect())
    }

    /// Number of missing cells in a column, or `None` if the column is absent.
    pub fn null_count(&self, name: &str) -> Option<usize> {
        let idx = self.column_index(name)?;
        Some(self.column_values(idx).filter(|v| v.is_none()).count())
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    /// Append a column, or overwrite it in place if the name already exists.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), ReconError> {
        if values.len() != self.rows.len() {
            return Err(ReconError::ColumnLength {
                column: name.into(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Remove a column, returning its values.
    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Cell>> {
        let idx = self.column_index(name)?;
        self.headers.remove(idx);
        Some(self.rows.iter_mut().map(|r| r.remove(idx)).collect())
    }

    /// Apply `f` to every cell of a column. Returns false if the column is absent.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> bool
    where
        F: FnMut(Cell) -> Cell,
    {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            let value = row[idx].take();
            row[idx] = f(value);
        }
        true
    }

    /// Drop exact duplicate rows, keeping the first occurrence. Returns the
    /// number of rows removed.
    pub fn dedup_rows(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Vec<Cell>> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        before - self.rows.len()
    }

    /// Rename repeated headers to `name.1`, `name.2`, ... so every column
    /// is addressable. The first occurrence keeps its name. Returns the
    /// number of headers renamed.
    pub fn dedup_headers(&mut self) -> usize {
        let mut renamed = 0;
        for i in 1..self.headers.len() {
            if !self.headers[..i].contains(&self.headers[i]) {
                continue;
            }
            let base = self.headers[i].clone();
            let name = (1..)
                .map(|n| format!("{base}.{n}"))
                .find(|candidate| !self.headers.contains(candidate))
                .unwrap_or_else(|| base.clone());
            self.headers[i] = name;
            renamed += 1;
        }
        renamed
    }

    /// Stack tables vertically. Columns are the union of all headers in
    /// first-appearance order; cells a table lacks are `None`. Repeated
    /// headers within one table are renamed first (see [`Table::dedup_headers`]).
    pub fn concat(mut tables: Vec<Table>) -> Table {
        for t in &mut tables {
            t.dedup_headers();
        }
        let mut headers: Vec<String> = Vec::new();
        for t in &tables {
            for h in &t.headers {
                if !headers.contains(h) {
                    headers.push(h.clone());
                }
            }
        }

        let mut out = Table::new(headers);
        for t in tables {
            let mapping: Vec<usize> = t
                .headers
                .iter()
                .map(|h| out.headers.iter().position(|o| o == h).unwrap_or_default())
                .collect();
            for row in t.rows {
                let mut target = vec![None; out.headers.len()];
                for (src, value) in row.into_iter().enumerate() {
                    target[mapping[src]] = value;
                }
                out.rows.push(target);
            }
        }
        out
    }
}
