//! Folder layout of a reporting day:
//! `<base>/<YYYY-MM-DD>/<report>/<DG>/{raw_data,output}`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

pub const DEFAULT_REPORT: &str = "Report_1_Comms_Reporting";
pub const DEFAULT_PARTITIONS: [&str; 3] = ["DG1", "DG2", "DG3"];

const RAW_DATA: &str = "raw_data";
const OUTPUT: &str = "output";

#[derive(Debug, Clone)]
pub struct ReportLayout {
    base: PathBuf,
    date: NaiveDate,
    report: String,
}

impl ReportLayout {
    pub fn new(base: PathBuf, date: NaiveDate, report: impl Into<String>) -> Self {
        Self {
            base,
            date,
            report: report.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn date_str(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn report_dir(&self) -> PathBuf {
        self.base.join(self.date_str()).join(&self.report)
    }

    pub fn partition(&self, name: &str) -> Partition {
        Partition {
            name: name.to_string(),
            root: self.report_dir().join(name),
        }
    }

    /// Partitions under the report folder: `DG*` directories, or failing
    /// that any directory holding a `raw_data` folder. Sorted by name and
    /// restricted to `filter` when it is non-empty.
    pub fn discover(&self, filter: &[String]) -> io::Result<Vec<Partition>> {
        let dir = self.report_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.sort();

        let mut names: Vec<String> = dirs.iter().filter(|d| d.starts_with("DG")).cloned().collect();
        if names.is_empty() {
            names = dirs
                .into_iter()
                .filter(|d| dir.join(d).join(RAW_DATA).is_dir())
                .collect();
        }

        if !filter.is_empty() {
            for wanted in filter {
                if !names.contains(wanted) {
                    warn!(partition = %wanted, dir = %dir.display(), "requested partition not found");
                }
            }
            names.retain(|n| filter.contains(n));
        }

        Ok(names.iter().map(|n| self.partition(n)).collect())
    }

    /// Create the input and output folders of each named partition.
    pub fn scaffold(&self, names: &[String]) -> io::Result<Vec<Partition>> {
        let mut created = Vec::with_capacity(names.len());
        for name in names {
            let partition = self.partition(name);
            std::fs::create_dir_all(partition.raw_data())?;
            std::fs::create_dir_all(partition.output())?;
            info!(partition = %name, dir = %partition.root.display(), "partition folders ready");
            created.push(partition);
        }
        Ok(created)
    }
}

pub fn default_partitions() -> Vec<String> {
    DEFAULT_PARTITIONS.iter().map(|s| s.to_string()).collect()
}

/// One DG folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub name: String,
    pub root: PathBuf,
}

impl Partition {
    pub fn raw_data(&self) -> PathBuf {
        self.root.join(RAW_DATA)
    }

    pub fn output(&self) -> PathBuf {
        self.root.join(OUTPUT)
    }

    /// True when `raw_data` is missing or holds no files.
    pub fn has_no_inputs(&self) -> io::Result<bool> {
        let dir = self.raw_data();
        if !dir.is_dir() {
            return Ok(true);
        }
        for entry in std::fs::read_dir(&dir)? {
            if entry?.file_type()?.is_file() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn artifacts(&self, date: &str) -> Artifacts {
        Artifacts::new(&self.output(), &self.name, date)
    }
}

/// Output file paths of one partition for one date.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub master: PathBuf,
    pub intermediate: PathBuf,
    pub final_report: PathBuf,
    pub summary: PathBuf,
    pub status_summary: PathBuf,
    pub ageing: PathBuf,
}

impl Artifacts {
    pub fn new(output: &Path, partition: &str, date: &str) -> Self {
        Self {
            master: output.join(format!("Master_SLA_Report_{date}.csv")),
            intermediate: output.join(format!("Intermediate_SLA_Report_{date}.csv")),
            final_report: output.join(format!("Final_SLA_Report_{date}.csv")),
            summary: output.join(format!("SLA_Summary_{partition}_{date}.json")),
            status_summary: output.join(format!("Comm_Status_Summary_{partition}_{date}.csv")),
            ageing: output.join(format!("Comm_Ageing_Analysis_{partition}_{date}.csv")),
        }
    }
}
