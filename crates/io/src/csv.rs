// CSV import/export for source extracts and report tables

use std::io::Read;
use std::path::Path;

use meterlink_recon::Table;

use crate::error::IoError;

/// Read a CSV extract. The first record is the header row; empty fields are
/// missing values.
pub fn import(path: &Path) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter).map_err(|e| IoError::csv(path, e))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header width, weighted by that width
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
/// A leading byte-order mark is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::io(path, e))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are commonly Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

pub fn import_from_string(content: &str, delimiter: u8) -> Result<Table, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(String::from).collect(),
        None => return Ok(Table::default()),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        rows.push(
            record
                .iter()
                .map(|field| if field.is_empty() { None } else { Some(field.to_string()) })
                .collect(),
        );
    }

    Ok(Table::from_rows(headers, rows))
}

/// Write a table with its header row. Missing values are written as empty fields.
pub fn export(table: &Table, path: &Path) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|e| IoError::csv(path, e))?;

    writer
        .write_record(table.headers())
        .map_err(|e| IoError::csv(path, e))?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
            .map_err(|e| IoError::csv(path, e))?;
    }

    writer.flush().map_err(|e| IoError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Name|Age|City\nAlice|30|Paris\nBob|25|London\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_header_trailing_space_preserved() {
        let table = import_from_string("New Meter QR Code ,Feeder\n M1 ,F1\nM2,\n", b',').unwrap();
        assert_eq!(table.headers(), &["New Meter QR Code ", "Feeder"]);
        assert_eq!(table.get(0, 0), Some(" M1 "));
        assert_eq!(table.get(1, 1), None);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = import_from_string("a,b,c\n1,2\n", b',').unwrap();
        assert_eq!(table.width(), 3);
        assert_eq!(table.get(0, 2), None);
    }

    #[test]
    fn test_empty_file_is_empty_table() {
        let table = import_from_string("", b',').unwrap();
        assert!(table.is_empty());
        assert_eq!(table.width(), 0);
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "Name;Age;City\nAlice;30;Paris\nBob;25;London\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.headers(), &["Name", "Age", "City"]);
        assert_eq!(table.get(0, 0), Some("Alice"));
        assert_eq!(table.get(1, 2), Some("London"));
    }

    #[test]
    fn test_bom_and_windows_1252() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Meter,Name\nM1,Zoë\n").unwrap();
        let table = import(&path).unwrap();
        assert_eq!(table.headers()[0], "Meter");

        let path = dir.path().join("cp1252.csv");
        // "Café" with é as a single 0xE9 byte
        fs::write(&path, b"Meter,Name\nM1,Caf\xe9\n").unwrap();
        let table = import(&path).unwrap();
        assert_eq!(table.get(0, 1), Some("Café"));
    }

    #[test]
    fn test_export_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let table = Table::from_rows(
            vec!["Meter".into(), "Cons Address".into()],
            vec![
                vec![Some("M1".into()), Some("12, Main Road".into())],
                vec![Some("M2".into()), None],
            ],
        );
        export(&table, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Meter,Cons Address\n"));
        assert!(content.contains("\"12, Main Road\""));

        let back = import(&path).unwrap();
        assert_eq!(back, table);
    }
}
