// File I/O: source extracts in, report artifacts out

pub mod csv;
pub mod error;
pub mod json;
pub mod source;
pub mod xlsx;

pub use error::IoError;
pub use source::{load_partition, load_source, read_table, resolve_files, unexpected_files, LoadedSource};
