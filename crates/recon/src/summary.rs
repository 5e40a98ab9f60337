use chrono::NaiveDate;

use crate::classify::ClassifiedTable;
use crate::config::PipelineConfig;
use crate::model::{MissingDataSummary, PartitionSummary, SourceMapping};
use crate::table::Table;

/// Assemble the per-partition JSON summary.
///
/// Node-id and routing gaps are counted on the master; missing timestamps
/// on the final table. A count is `None` when its column does not exist.
pub fn build_summary(
    processing_date: NaiveDate,
    partition: &str,
    master: &Table,
    classified: &ClassifiedTable,
    source_mapping: SourceMapping,
    config: &PipelineConfig,
) -> PartitionSummary {
    PartitionSummary {
        date: processing_date.format("%Y-%m-%d").to_string(),
        dg_name: partition.to_string(),
        total_records: classified.len(),
        comm_status_overall: classified.counts(),
        missing_data_summary: MissingDataSummary {
            meters_without_node_id: master.null_count(&config.summary.node_id_column),
            meters_without_routing_info: master.null_count(&config.summary.routing_column),
            rows_missing_communicated_at: classified
                .table
                .null_count(&config.status.timestamp_field),
            source_mapping,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommStatus, MatchStats};

    #[test]
    fn summary_shape() {
        let config = PipelineConfig::builtin().unwrap();
        let master = Table::from_rows(
            vec!["NodeId".into()],
            vec![vec![Some("1".into())], vec![None]],
        );
        let final_table = Table::from_rows(
            vec!["Communicated At".into()],
            vec![vec![Some("05-02-2026".into())], vec![None]],
        );
        let classified = ClassifiedTable {
            table: final_table,
            statuses: vec![CommStatus::Communicating, CommStatus::NeverComm],
        };
        let mapping = SourceMapping(vec![MatchStats::base("Warehouse", 2)]);
        let date = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();

        let summary = build_summary(date, "DG1", &master, &classified, mapping, &config);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["date"], "2026-02-05");
        assert_eq!(json["dg_name"], "DG1");
        assert_eq!(json["total_records"], 2);
        assert_eq!(json["comm_status_overall"]["Never Comm"], 1);
        let missing = &json["missing_data_summary"];
        assert_eq!(missing["meters_without_node_id"], 1);
        assert!(missing["meters_without_routing_info"].is_null());
        assert_eq!(missing["rows_missing_communicated_at"], 1);
        assert_eq!(missing["source_mapping"]["Warehouse"]["total"], 2);
    }
}
