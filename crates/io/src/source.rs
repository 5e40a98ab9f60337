//! Source resolution: map each configured source onto the files of a
//! partition's raw data folder and load them as one table.

use std::path::{Path, PathBuf};

use glob::Pattern;
use meterlink_recon::config::{PipelineConfig, SourceConfig};
use meterlink_recon::{PartitionInputs, Table};
use tracing::{debug, info, warn};

use crate::error::IoError;

/// Files that made up one loaded source.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub name: String,
    pub files: Vec<PathBuf>,
    pub table: Table,
}

/// Load a table by extension: CSV-like text or a spreadsheet workbook.
pub fn read_table(path: &Path) -> Result<Table, IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "tsv" | "txt" => crate::csv::import(path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => crate::xlsx::import(path),
        _ => Err(IoError::UnsupportedFormat { path: path.to_path_buf() }),
    }
}

/// Files for `source` in `dir`: the matches of the first pattern that
/// matches anything, sorted by path.
pub fn resolve_files(dir: &Path, source: &SourceConfig) -> Result<Vec<PathBuf>, IoError> {
    let prefix = Pattern::escape(&dir.to_string_lossy());
    for pattern in &source.files {
        let full = format!("{prefix}/{pattern}");
        let entries = glob::glob(&full).map_err(|e| IoError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        if !files.is_empty() {
            files.sort();
            return Ok(files);
        }
    }
    Ok(Vec::new())
}

/// Load one source, concatenating every resolved file. `Ok(None)` when no
/// file matches.
pub fn load_source(dir: &Path, source: &SourceConfig) -> Result<Option<LoadedSource>, IoError> {
    let files = resolve_files(dir, source)?;
    if files.is_empty() {
        return Ok(None);
    }

    let mut tables = Vec::with_capacity(files.len());
    for file in &files {
        let mut table = read_table(file)?;
        let renamed = table.dedup_headers();
        if renamed > 0 {
            warn!(file = %file.display(), renamed, "repeated column headers renamed");
        }
        debug!(file = %file.display(), rows = table.len(), "read file");
        tables.push(table);
    }

    let mut table = if tables.len() == 1 {
        tables.remove(0)
    } else {
        Table::concat(tables)
    };

    if source.dedup {
        let removed = table.dedup_rows();
        if removed > 0 {
            info!(source = %source.name, removed, "dropped duplicate rows");
        }
    }

    info!(
        source = %source.name,
        files = files.len(),
        rows = table.len(),
        "loaded source"
    );
    Ok(Some(LoadedSource {
        name: source.name.clone(),
        files,
        table,
    }))
}

/// Load every configured source present in `dir`.
pub fn load_partition(
    dir: &Path,
    config: &PipelineConfig,
) -> Result<(PartitionInputs, Vec<LoadedSource>), IoError> {
    let mut inputs = PartitionInputs::default();
    let mut loaded = Vec::new();
    for source in &config.sources {
        match load_source(dir, source)? {
            Some(mut src) => {
                let table = std::mem::take(&mut src.table);
                inputs.insert(&source.name, table);
                loaded.push(src);
            }
            None if source.required => {
                warn!(source = %source.name, dir = %dir.display(), "required source not found");
            }
            None => debug!(source = %source.name, "optional source not found"),
        }
    }
    Ok((inputs, loaded))
}

/// File names in `dir` that no source pattern claims.
pub fn unexpected_files(dir: &Path, config: &PipelineConfig) -> Result<Vec<String>, IoError> {
    let mut patterns = Vec::new();
    for source in &config.sources {
        for p in &source.files {
            patterns.push(Pattern::new(p).map_err(|e| IoError::Pattern {
                pattern: p.clone(),
                message: e.to_string(),
            })?);
        }
    }

    let mut unexpected = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| IoError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| IoError::io(dir, e))?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !patterns.iter().any(|p| p.matches(&name)) {
            unexpected.push(name);
        }
    }
    unexpected.sort();
    Ok(unexpected)
}
