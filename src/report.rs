//! Final run report: per-adapter status plus run-level totals.
//!
//! Every selected adapter appears with an explicit status so a swallowed
//! error is distinguishable from a deliberately empty result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdapterStatus {
    /// All records processed.
    Success,
    /// Adapter completed but skipped fields or unmapped entities.
    Partial { skipped: u64 },
    /// Configuration or acquisition failed; no output from this adapter.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterReport {
    pub name: String,
    #[serde(flatten)]
    pub status: AdapterStatus,
    pub nodes: u64,
    pub edges: u64,
    pub seconds: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub adapters: Vec<AdapterReport>,
    pub nodes_written: u64,
    pub edges_written: u64,
    pub duplicates_discarded: u64,
    pub dangling_edge_refs: u64,
    pub schema_skips: u64,
    pub seconds: f64,
}

impl RunReport {
    pub fn failed_count(&self) -> usize {
        self.adapters
            .iter()
            .filter(|a| matches!(a.status, AdapterStatus::Failed { .. }))
            .count()
    }

    /// Human summary printed after a run, mirroring the log-plus-summary
    /// convention used by the extraction CLI.
    pub fn print_summary(&self) {
        println!();
        println!("=== Run {} ===", self.run_id);
        for adapter in &self.adapters {
            let status = match &adapter.status {
                AdapterStatus::Success => "ok".to_string(),
                AdapterStatus::Partial { skipped } => format!("partial ({} skipped)", skipped),
                AdapterStatus::Failed { error } => format!("FAILED: {}", error),
            };
            println!(
                "  {:<12} {:<40} nodes={:<8} edges={:<8} {:.2}s",
                adapter.name, status, adapter.nodes, adapter.edges, adapter.seconds
            );
        }
        println!();
        println!("Nodes written:        {}", self.nodes_written);
        println!("Edges written:        {}", self.edges_written);
        println!("Duplicates discarded: {}", self.duplicates_discarded);
        println!("Dangling edge refs:   {}", self.dangling_edge_refs);
        println!("Schema skips:         {}", self.schema_skips);
        println!("Total time:           {:.2}s", self.seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunReport {
        RunReport {
            run_id: "20250101120000".into(),
            adapters: vec![
                AdapterReport {
                    name: "uniprot".into(),
                    status: AdapterStatus::Success,
                    nodes: 100,
                    edges: 50,
                    seconds: 1.5,
                },
                AdapterReport {
                    name: "string".into(),
                    status: AdapterStatus::Failed {
                        error: "all acquisition strategies failed".into(),
                    },
                    nodes: 0,
                    edges: 0,
                    seconds: 0.2,
                },
            ],
            nodes_written: 100,
            edges_written: 50,
            duplicates_discarded: 3,
            dangling_edge_refs: 1,
            schema_skips: 0,
            seconds: 2.0,
        }
    }

    #[test]
    fn failed_count_matches_statuses() {
        assert_eq!(sample().failed_count(), 1);
    }

    #[test]
    fn json_roundtrip_preserves_status() {
        let report = sample();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.adapters.len(), 2);
        assert!(matches!(parsed.adapters[0].status, AdapterStatus::Success));
        assert!(matches!(
            parsed.adapters[1].status,
            AdapterStatus::Failed { .. }
        ));
    }

    #[test]
    fn status_serializes_as_tagged_field() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["adapters"][0]["status"], "success");
        assert_eq!(json["adapters"][1]["status"], "failed");
        assert!(json["adapters"][1]["error"]
            .as_str()
            .unwrap()
            .contains("acquisition"));
    }
}
