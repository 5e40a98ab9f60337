// JSON export

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::IoError;

/// Write `value` as pretty-printed JSON with a trailing newline.
pub fn export<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), IoError> {
    let file = File::create(path).map_err(|e| IoError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| IoError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    writer.write_all(b"\n").map_err(|e| IoError::io(path, e))?;
    writer.flush().map_err(|e| IoError::io(path, e))?;

    Ok(())
}
