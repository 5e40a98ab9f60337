use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (no base source, duplicate names, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// The mandatory base source was not supplied for a partition.
    #[error("base source '{name}' is missing")]
    MissingBase { name: String },

    /// A present source lacks its join key column.
    #[error("source '{name}': join key column '{column}' not found")]
    MissingJoinKey { name: String, column: String },

    /// A present source lacks one or more expected columns.
    #[error("source '{name}': missing columns {columns:?}")]
    MissingColumns { name: String, columns: Vec<String> },

    /// A required column is absent from a table.
    #[error("column '{column}' not found")]
    MissingColumn { column: String },

    /// Column values do not line up with the table's rows.
    #[error("column '{column}': expected {expected} values, got {actual}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A status label that is not one of the three known labels.
    #[error("row {row}: unknown status label '{value}'")]
    InvalidStatus { row: usize, value: String },
}
