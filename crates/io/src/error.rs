use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: CSV error: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: failed to open workbook: {message}", path.display())]
    Workbook { path: PathBuf, message: String },

    #[error("{}: workbook contains no sheets", path.display())]
    NoSheets { path: PathBuf },

    #[error("{}: unsupported file type", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid file pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("{}: JSON error: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Recon(#[from] meterlink_recon::ReconError),
}

impl IoError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &std::path::Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}
