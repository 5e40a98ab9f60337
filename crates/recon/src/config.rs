use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// Pipeline shipped with the crate: the six-source daily comms report.
pub const BUILTIN_PIPELINE: &str = include_str!("../pipeline.default.toml");

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Join order. The first entry is the base table.
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub coalesce: Vec<CoalesceRule>,
    pub projection: Vec<ProjectionField>,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub rollup: RollupConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Schema descriptor for one input extract.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    /// Glob patterns relative to the partition's raw data folder. The first
    /// pattern that matches anything wins; all its matches are concatenated.
    pub files: Vec<String>,
    /// Join key column in this source, matched byte-for-byte.
    pub join_key: String,
    #[serde(default)]
    pub required: bool,
    /// Expected header set.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Suffix for columns whose names are already taken in the master.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Join against the numeric-normalized values of this master column
    /// instead of the canonical key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_on: Option<String>,
    /// Drop exact duplicate rows after concatenating the matched files.
    #[serde(default)]
    pub dedup: bool,
}

impl SourceConfig {
    pub fn collision_suffix(&self) -> String {
        self.suffix
            .clone()
            .unwrap_or_else(|| format!("_{}", self.name.to_uppercase()))
    }
}

// ---------------------------------------------------------------------------
// Coalesce + projection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoalesceRule {
    pub target: String,
    /// Highest priority first.
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectionField {
    /// Column name in the intermediate / final reports.
    pub field: String,
    /// Master column it is read from.
    pub column: String,
}

// ---------------------------------------------------------------------------
// Status, rollup, summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusConfig {
    /// Projected field holding the last-communicated timestamp.
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,
    /// Projected field holding the installation date (ageing of never-communicating meters).
    /// An empty string turns Never Comm ageing off.
    #[serde(default = "default_install_field")]
    pub install_field: Option<String>,
    #[serde(default = "default_status_column")]
    pub status_column: String,
    #[serde(default = "default_remarks_column")]
    pub remarks_column: String,
}

impl StatusConfig {
    /// Install-date field, `None` when Never Comm ageing is off.
    pub fn install_field(&self) -> Option<&str> {
        self.install_field.as_deref().filter(|f| !f.trim().is_empty())
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            timestamp_field: default_timestamp_field(),
            install_field: default_install_field(),
            status_column: default_status_column(),
            remarks_column: default_remarks_column(),
        }
    }
}

fn default_timestamp_field() -> String {
    "Communicated At".into()
}

fn default_install_field() -> Option<String> {
    Some("Installation date".into())
}

fn default_status_column() -> String {
    "Comm Status".into()
}

fn default_remarks_column() -> String {
    "Remarks".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RollupConfig {
    /// Organizational levels, outermost first.
    pub levels: Vec<String>,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            levels: vec!["Circle".into(), "Division".into(), "Subdivision".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummaryConfig {
    #[serde(default = "default_node_id_column")]
    pub node_id_column: String,
    #[serde(default = "default_routing_column")]
    pub routing_column: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            node_id_column: default_node_id_column(),
            routing_column: default_routing_column(),
        }
    }
}

fn default_node_id_column() -> String {
    "NodeId".into()
}

fn default_routing_column() -> String {
    "Gateway ID".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn builtin() -> Result<Self, ReconError> {
        Self::from_toml(BUILTIN_PIPELINE)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    /// The base table descriptor (always the first source once validated).
    pub fn base(&self) -> &SourceConfig {
        &self.sources[0]
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let Some(base) = self.sources.first() else {
            return Err(ReconError::ConfigValidation("at least one source is required".into()));
        };

        if !base.required {
            return Err(ReconError::ConfigValidation(format!(
                "first source '{}' must be the required base table",
                base.name
            )));
        }

        if base.join_on.is_some() {
            return Err(ReconError::ConfigValidation(format!(
                "base source '{}' cannot use join_on",
                base.name
            )));
        }

        let mut names = HashSet::new();
        for (i, source) in self.sources.iter().enumerate() {
            if !names.insert(source.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            if i > 0 && source.required {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': only the first source may be required",
                    source.name
                )));
            }
            if source.files.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': at least one file pattern is required",
                    source.name
                )));
            }
            if source.join_key.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': join_key cannot be empty",
                    source.name
                )));
            }
        }

        if self.projection.is_empty() {
            return Err(ReconError::ConfigValidation("projection cannot be empty".into()));
        }
        let mut fields = HashSet::new();
        for p in &self.projection {
            if !fields.insert(p.field.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate projection field '{}'",
                    p.field
                )));
            }
        }

        let mut targets = HashSet::new();
        for rule in &self.coalesce {
            if !targets.insert(rule.target.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate coalesce target '{}'",
                    rule.target
                )));
            }
        }

        if self.rollup.levels.is_empty() {
            return Err(ReconError::ConfigValidation("rollup needs at least one level".into()));
        }
        let mut levels = HashSet::new();
        for level in &self.rollup.levels {
            if !levels.insert(level.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "duplicate rollup level '{level}'"
                )));
            }
        }

        if self.status.status_column.is_empty() || self.status.timestamp_field.is_empty() {
            return Err(ReconError::ConfigValidation(
                "status column and timestamp field must be named".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "Minimal"

[[sources]]
name = "base"
files = ["base.csv"]
join_key = "id"
required = true

[[sources]]
name = "extra"
files = ["extra.csv"]
join_key = "ref"

[[projection]]
field = "ID"
column = "id"
"#;

    #[test]
    fn builtin_pipeline_parses() {
        let config = PipelineConfig::builtin().unwrap();
        assert_eq!(config.sources.len(), 6);
        assert_eq!(config.base().name, "Warehouse");
        assert_eq!(config.projection.len(), 20);
        assert_eq!(config.coalesce.len(), 7);
        assert_eq!(config.rollup.levels, vec!["Circle", "Division", "Subdivision"]);

        let order: Vec<&str> = config.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "Warehouse",
                "New_Service_connection",
                "Merged_CI-MI",
                "Meter_Installation",
                "Node_ID",
                "Routings"
            ]
        );
    }

    #[test]
    fn builtin_keeps_trailing_space_in_join_key() {
        let config = PipelineConfig::builtin().unwrap();
        let nsc = config.source("New_Service_connection").unwrap();
        assert_eq!(nsc.join_key, "New Meter QR Code ");
        assert!(nsc.columns.iter().any(|c| c == "New Meter QR Code "));
    }

    #[test]
    fn builtin_routing_joins_on_node_id() {
        let config = PipelineConfig::builtin().unwrap();
        let routing = config.source("Routings").unwrap();
        assert_eq!(routing.join_on.as_deref(), Some("NodeId"));
        assert!(routing.dedup);
        assert_eq!(routing.files, vec!["Routings Part-*.xlsx", "Routings*.xlsx"]);
    }

    #[test]
    fn defaults_fill_optional_sections() {
        let config = PipelineConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.status.status_column, "Comm Status");
        assert_eq!(config.status.install_field.as_deref(), Some("Installation date"));
        assert_eq!(config.summary.node_id_column, "NodeId");
        assert!(config.coalesce.is_empty());
        assert_eq!(config.sources[1].collision_suffix(), "_EXTRA");
    }

    #[test]
    fn empty_install_field_turns_never_comm_ageing_off() {
        let config = PipelineConfig::from_toml(&format!("{MINIMAL}\n[status]\ninstall_field = \"\"\n")).unwrap();
        assert_eq!(config.status.install_field(), None);
        assert_eq!(StatusConfig::default().install_field(), Some("Installation date"));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = PipelineConfig::builtin().unwrap();
        let text = config.to_toml().unwrap();
        let again = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(again.sources.len(), config.sources.len());
        assert_eq!(again.sources[1].join_key, "New Meter QR Code ");
    }

    #[test]
    fn reject_optional_base() {
        let input = MINIMAL.replacen("required = true", "required = false", 1);
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("required base"));
    }

    #[test]
    fn reject_second_required_source() {
        let input = MINIMAL.replace("join_key = \"ref\"", "join_key = \"ref\"\nrequired = true");
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("only the first source"));
    }

    #[test]
    fn reject_duplicate_source_names() {
        let input = MINIMAL.replace("name = \"extra\"", "name = \"base\"");
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("duplicate source name"));
    }

    #[test]
    fn reject_empty_projection() {
        let input = r#"
name = "Bad"
projection = []

[[sources]]
name = "base"
files = ["base.csv"]
join_key = "id"
required = true
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("projection"));
    }

    #[test]
    fn reject_join_on_base() {
        let input = MINIMAL.replacen("required = true", "required = true\njoin_on = \"x\"", 1);
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("join_on"));
    }

    #[test]
    fn reject_unknown_field_type() {
        let input = MINIMAL.replace("join_key = \"ref\"", "join_key = 5");
        assert!(PipelineConfig::from_toml(&input).is_err());
    }
}
