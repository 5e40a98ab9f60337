use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Communication status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CommStatus {
    Communicating,
    #[serde(rename = "Non Comm")]
    NonComm,
    #[serde(rename = "Never Comm")]
    NeverComm,
}

impl CommStatus {
    pub const ALL: [CommStatus; 3] = [Self::Communicating, Self::NeverComm, Self::NonComm];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Communicating => "Communicating",
            Self::NonComm => "Non Comm",
            Self::NeverComm => "Never Comm",
        }
    }
}

impl std::fmt::Display for CommStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CommStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Communicating" => Ok(Self::Communicating),
            "Non Comm" => Ok(Self::NonComm),
            "Never Comm" => Ok(Self::NeverComm),
            other => Err(other.to_string()),
        }
    }
}

/// Per-status record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    #[serde(rename = "Communicating")]
    pub communicating: usize,
    #[serde(rename = "Never Comm")]
    pub never_comm: usize,
    #[serde(rename = "Non Comm")]
    pub non_comm: usize,
}

impl StatusCounts {
    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a CommStatus>) -> Self {
        let mut counts = Self::default();
        for s in statuses {
            counts.add(*s);
        }
        counts
    }

    pub fn add(&mut self, status: CommStatus) {
        match status {
            CommStatus::Communicating => self.communicating += 1,
            CommStatus::NonComm => self.non_comm += 1,
            CommStatus::NeverComm => self.never_comm += 1,
        }
    }

    pub fn get(&self, status: CommStatus) -> usize {
        match status {
            CommStatus::Communicating => self.communicating,
            CommStatus::NonComm => self.non_comm,
            CommStatus::NeverComm => self.never_comm,
        }
    }

    pub fn total(&self) -> usize {
        self.communicating + self.never_comm + self.non_comm
    }
}

/// `100 * part / whole` rounded to 2 decimals; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(100.0 * part as f64 / whole as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Match statistics
// ---------------------------------------------------------------------------

/// Join statistics for one source. The base table only carries `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    #[serde(skip)]
    pub source: String,
    pub total: usize,
    #[serde(rename = "mapped", skip_serializing_if = "Option::is_none")]
    pub matched: Option<usize>,
    #[serde(rename = "unmapped", skip_serializing_if = "Option::is_none")]
    pub unmatched: Option<usize>,
}

impl MatchStats {
    pub fn base(source: &str, total: usize) -> Self {
        Self {
            source: source.into(),
            total,
            matched: None,
            unmatched: None,
        }
    }

    pub fn joined(source: &str, total: usize, matched: usize) -> Self {
        Self {
            source: source.into(),
            total,
            matched: Some(matched),
            unmatched: Some(total.saturating_sub(matched)),
        }
    }
}

/// Per-source statistics in join order, serialized as a JSON object keyed by
/// source name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMapping(pub Vec<MatchStats>);

impl SourceMapping {
    pub fn get(&self, source: &str) -> Option<&MatchStats> {
        self.0.iter().find(|s| s.source == source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MatchStats> {
        self.0.iter()
    }
}

impl Serialize for SourceMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for stats in &self.0 {
            map.serialize_entry(&stats.source, stats)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// One row of the hierarchical rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollupRow {
    pub category: String,
    /// One value per configured level; blank for levels the row does not cover.
    pub levels: Vec<String>,
    pub counts: StatusCounts,
    pub total: usize,
    pub communicating_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeingRow {
    pub category: CommStatus,
    pub bucket: &'static str,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgeingReport {
    pub rows: Vec<AgeingRow>,
    /// Records of a category left out of every bucket (unparseable or
    /// out-of-range age).
    pub excluded_non_comm: usize,
    pub excluded_never_comm: usize,
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionSummary {
    pub date: String,
    pub dg_name: String,
    pub total_records: usize,
    pub comm_status_overall: StatusCounts,
    pub missing_data_summary: MissingDataSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingDataSummary {
    pub meters_without_node_id: Option<usize>,
    pub meters_without_routing_info: Option<usize>,
    pub rows_missing_communicated_at: Option<usize>,
    pub source_mapping: SourceMapping,
}

/// Parse a status label, attaching the row it came from.
pub fn parse_status(row: usize, value: Option<&str>) -> Result<CommStatus, ReconError> {
    let raw = value.unwrap_or_default();
    raw.parse().map_err(|value| ReconError::InvalidStatus { row, value })
}
