//! ChEMBL adapter: drug and compound nodes from the molecule endpoint,
//! compound-target edges from the mechanism endpoint.
//!
//! Molecules are required; mechanisms are best-effort. A mechanism fetch
//! failure downgrades the adapter to partial instead of failing it, since
//! the compound nodes are still worth writing.

use super::{record_limit, AcquireContext, Adapter};
use crate::config::AdapterOptions;
use crate::error::{AcquireError, ConfigError, StrategyError};
use crate::fallback::{self, Strategy};
use crate::models::{clean_field, curie, Edge, Node};
use serde::Deserialize;
use std::cell::Cell;
use tracing::warn;

const MOLECULE_URL: &str =
    "https://www.ebi.ac.uk/chembl/api/data/molecule.json?format=json&limit=1000";
const MECHANISM_URL: &str =
    "https://www.ebi.ac.uk/chembl/api/data/mechanism.json?format=json&limit=1000";

const MOLECULES_CACHE: &str = "chembl_molecules.json";
const MECHANISMS_CACHE: &str = "chembl_mechanisms.json";

/// Clinical phase at which a molecule counts as an approved drug.
const APPROVED_PHASE: f64 = 4.0;

#[derive(Debug, Default, Deserialize)]
struct MoleculePage {
    #[serde(default)]
    molecules: Vec<Molecule>,
}

#[derive(Debug, Deserialize)]
struct Molecule {
    molecule_chembl_id: Option<String>,
    pref_name: Option<String>,
    /// Numeric in recent API versions, string in older ones.
    max_phase: Option<serde_json::Value>,
    molecule_properties: Option<MoleculeProperties>,
}

#[derive(Debug, Deserialize)]
struct MoleculeProperties {
    full_mwt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MechanismPage {
    #[serde(default)]
    mechanisms: Vec<Mechanism>,
}

#[derive(Debug, Deserialize)]
struct Mechanism {
    molecule_chembl_id: Option<String>,
    target_chembl_id: Option<String>,
    mechanism_of_action: Option<String>,
    action_type: Option<String>,
}

pub struct ChemblAdapter {
    test_mode: bool,
    /// Minimum clinical phase for a molecule to be emitted at all.
    min_phase: Option<u32>,
    molecules: Vec<Molecule>,
    mechanisms: Vec<Mechanism>,
    acquired: bool,
    skipped_fields: Cell<u64>,
}

impl ChemblAdapter {
    pub fn new() -> Self {
        Self {
            test_mode: false,
            min_phase: None,
            molecules: Vec::new(),
            mechanisms: Vec::new(),
            acquired: false,
            skipped_fields: Cell::new(0),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_raw(mut self, molecules: &str, mechanisms: &str) -> Self {
        self.molecules = serde_json::from_str::<MoleculePage>(molecules)
            .expect("test molecule payload")
            .molecules;
        self.mechanisms = serde_json::from_str::<MechanismPage>(mechanisms)
            .expect("test mechanism payload")
            .mechanisms;
        self.acquired = true;
        self
    }

    fn skip_field(&self) {
        self.skipped_fields.set(self.skipped_fields.get() + 1);
    }

    /// ChEMBL has served `max_phase` both as a number and as a string.
    fn parse_phase(&self, raw: &serde_json::Value) -> Option<f64> {
        match raw {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse::<f64>().ok().or_else(|| {
                self.skip_field();
                None
            }),
            serde_json::Value::Null => None,
            _ => {
                self.skip_field();
                None
            }
        }
    }

    fn molecule_node(&self, molecule: &Molecule) -> Option<Node> {
        let id = molecule.molecule_chembl_id.as_deref()?;
        let phase = molecule.max_phase.as_ref().and_then(|p| self.parse_phase(p));
        if let Some(min) = self.min_phase {
            if phase.unwrap_or(0.0) < f64::from(min) {
                return None;
            }
        }
        let label = if phase.unwrap_or(0.0) >= APPROVED_PHASE {
            "drug"
        } else {
            "compound"
        };
        let mut node = Node::new(curie("chembl", id), label).with("source", "chembl");
        if let Some(name) = molecule.pref_name.as_deref().filter(|n| !n.is_empty()) {
            node = node.with("name", clean_field(name));
        }
        if let Some(phase) = phase {
            node = node.with("max_phase", phase);
        }
        if let Some(raw) = molecule
            .molecule_properties
            .as_ref()
            .and_then(|p| p.full_mwt.as_deref())
        {
            match raw.parse::<f64>() {
                Ok(weight) => node = node.with("molecular_weight", weight),
                Err(_) => self.skip_field(),
            }
        }
        Some(node)
    }

    fn mechanism_edge(&self, mechanism: &Mechanism) -> Option<Edge> {
        let molecule = mechanism.molecule_chembl_id.as_deref()?;
        let target = mechanism.target_chembl_id.as_deref()?;
        let mut edge = Edge::new(
            curie("chembl", molecule),
            curie("chembl", target),
            "compound_targets_protein",
        )
        .with("source", "chembl");
        if let Some(action) = mechanism.action_type.as_deref() {
            edge = edge.with("action_type", clean_field(action));
        }
        if let Some(moa) = mechanism.mechanism_of_action.as_deref() {
            edge = edge.with("mechanism_of_action", clean_field(moa));
        }
        Some(edge)
    }
}

impl Default for ChemblAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for ChemblAdapter {
    fn name(&self) -> &'static str {
        "chembl"
    }

    fn groups(&self) -> &'static [&'static str] {
        &["drugs"]
    }

    fn configure(&mut self, options: &AdapterOptions) -> Result<(), ConfigError> {
        if let Some(threshold) = options.score_threshold {
            super::validate_threshold(threshold)?;
        }
        self.min_phase = options.evidence_filter;
        self.test_mode = options.test_mode;
        Ok(())
    }

    fn acquire(&mut self, ctx: &AcquireContext) -> Result<(), AcquireError> {
        if self.acquired {
            return Ok(());
        }

        let molecule_strategies = [
            Strategy::new("rest-molecules", || {
                let raw = ctx.http_get(MOLECULE_URL)?;
                require_json::<MoleculePage>(&raw)?;
                Ok(raw)
            }),
            Strategy::new("cache-snapshot", || {
                let raw = ctx.read_cached(MOLECULES_CACHE)?;
                require_json::<MoleculePage>(&raw)?;
                Ok(raw)
            }),
        ];
        let raw = fallback::resolve(self.name(), &molecule_strategies)?;
        ctx.store_cache(MOLECULES_CACHE, &raw);
        self.molecules = parse_page::<MoleculePage>(self.name(), &raw)?.molecules;

        // Mechanisms enrich the graph with target edges but are not worth
        // failing the adapter over: a fetch failure or a corrupt payload
        // both degrade to nodes-only.
        let mechanism_strategies = [
            Strategy::new("rest-mechanisms", || {
                let raw = ctx.http_get(MECHANISM_URL)?;
                require_json::<MechanismPage>(&raw)?;
                Ok(raw)
            }),
            Strategy::new("cache-snapshot", || {
                let raw = ctx.read_cached(MECHANISMS_CACHE)?;
                require_json::<MechanismPage>(&raw)?;
                Ok(raw)
            }),
        ];
        match fallback::resolve(self.name(), &mechanism_strategies) {
            Ok(raw) => match serde_json::from_str::<MechanismPage>(&raw) {
                Ok(page) => {
                    ctx.store_cache(MECHANISMS_CACHE, &raw);
                    self.mechanisms = page.mechanisms;
                }
                Err(e) => {
                    warn!(error = %e, "ChEMBL mechanism payload unusable, emitting nodes only");
                    self.skip_field();
                }
            },
            Err(e) => {
                warn!(error = %e, "ChEMBL mechanisms unavailable, emitting nodes only");
                self.skip_field();
            }
        }

        self.acquired = true;
        Ok(())
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(
            self.molecules
                .iter()
                .take(record_limit(self.test_mode))
                .filter_map(|m| self.molecule_node(m)),
        )
    }

    fn edges(&self) -> Box<dyn Iterator<Item = Edge> + '_> {
        Box::new(
            self.mechanisms
                .iter()
                .take(record_limit(self.test_mode))
                .filter_map(|m| self.mechanism_edge(m)),
        )
    }

    fn skipped_fields(&self) -> u64 {
        self.skipped_fields.get()
    }
}

/// Strategy-level validation so a non-JSON error page fails over to the
/// next strategy instead of poisoning the cache.
fn require_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<(), StrategyError> {
    serde_json::from_str::<T>(raw)
        .map(|_| ())
        .map_err(|e| StrategyError::Parse(format!("unexpected response shape: {}", e)))
}

fn parse_page<T: serde::de::DeserializeOwned>(adapter: &str, raw: &str) -> Result<T, AcquireError> {
    serde_json::from_str(raw).map_err(|e| AcquireError {
        adapter: adapter.to_string(),
        attempts: vec![("parse".to_string(), e.to_string())],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOLECULES: &str = r#"{
        "molecules": [
            {
                "molecule_chembl_id": "CHEMBL25",
                "pref_name": "ASPIRIN",
                "max_phase": 4.0,
                "molecule_properties": {"full_mwt": "180.16"}
            },
            {
                "molecule_chembl_id": "CHEMBL6329",
                "pref_name": null,
                "max_phase": "1",
                "molecule_properties": {"full_mwt": "heavy"}
            },
            {
                "molecule_chembl_id": null,
                "pref_name": "ORPHAN",
                "max_phase": null,
                "molecule_properties": null
            }
        ]
    }"#;

    const MECHANISMS: &str = r#"{
        "mechanisms": [
            {
                "molecule_chembl_id": "CHEMBL25",
                "target_chembl_id": "CHEMBL204",
                "mechanism_of_action": "Cyclooxygenase inhibitor",
                "action_type": "INHIBITOR"
            },
            {
                "molecule_chembl_id": "CHEMBL6329",
                "target_chembl_id": null,
                "mechanism_of_action": null,
                "action_type": null
            }
        ]
    }"#;

    fn adapter() -> ChemblAdapter {
        ChemblAdapter::new().with_raw(MOLECULES, MECHANISMS)
    }

    #[test]
    fn approved_molecules_become_drugs() {
        let adapter = adapter();
        let nodes: Vec<_> = adapter.nodes().collect();
        assert_eq!(nodes.len(), 2); // null id row dropped
        assert_eq!(nodes[0].id, "chembl:CHEMBL25");
        assert_eq!(nodes[0].label, "drug");
        assert_eq!(nodes[0].properties["name"].to_field(), "ASPIRIN");
        assert_eq!(nodes[1].label, "compound");
    }

    #[test]
    fn string_phase_is_parsed() {
        let adapter = adapter();
        let nodes: Vec<_> = adapter.nodes().collect();
        assert_eq!(nodes[1].properties["max_phase"].to_field(), "1");
    }

    #[test]
    fn bad_weight_is_skipped_not_fatal() {
        let adapter = adapter();
        let nodes: Vec<_> = adapter.nodes().collect();
        assert!(!nodes[1].properties.contains_key("molecular_weight"));
        assert!(adapter.skipped_fields() > 0);
    }

    #[test]
    fn mechanism_edges_require_both_endpoints() {
        let adapter = adapter();
        let edges: Vec<_> = adapter.edges().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source, "chembl:CHEMBL25");
        assert_eq!(edges[0].target, "chembl:CHEMBL204");
        assert_eq!(edges[0].label, "compound_targets_protein");
        assert_eq!(edges[0].properties["action_type"].to_field(), "INHIBITOR");
    }

    #[test]
    fn acquire_reads_cached_snapshots_offline() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(MOLECULES_CACHE), MOLECULES).unwrap();
        std::fs::write(dir.path().join(MECHANISMS_CACHE), MECHANISMS).unwrap();
        let ctx = AcquireContext::new(dir.path(), true, true);

        let mut adapter = ChemblAdapter::new();
        adapter.acquire(&ctx).unwrap();
        assert_eq!(adapter.nodes().count(), 2);
        assert_eq!(adapter.edges().count(), 1);
    }

    #[test]
    fn evidence_filter_drops_low_phase_molecules() {
        let mut adapter = adapter();
        let options = AdapterOptions {
            evidence_filter: Some(4),
            ..Default::default()
        };
        adapter.configure(&options).unwrap();
        let nodes: Vec<_> = adapter.nodes().collect();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].label, "drug");
    }

    #[test]
    fn missing_mechanisms_degrade_to_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(MOLECULES_CACHE), MOLECULES).unwrap();
        let ctx = AcquireContext::new(dir.path(), true, true);

        let mut adapter = ChemblAdapter::new();
        adapter.acquire(&ctx).unwrap();
        assert_eq!(adapter.edges().count(), 0);
        assert!(adapter.skipped_fields() > 0);
    }

    #[test]
    fn corrupt_mechanism_cache_degrades_to_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(MOLECULES_CACHE), MOLECULES).unwrap();
        std::fs::write(dir.path().join(MECHANISMS_CACHE), "<html>not json</html>").unwrap();
        let ctx = AcquireContext::new(dir.path(), true, true);

        let mut adapter = ChemblAdapter::new();
        adapter.acquire(&ctx).unwrap();
        // Molecules survive; the corrupt mechanism payload only costs edges.
        assert_eq!(adapter.nodes().count(), 2);
        assert_eq!(adapter.edges().count(), 0);
        assert!(adapter.skipped_fields() > 0);
    }

    #[test]
    fn corrupt_molecule_cache_is_an_acquisition_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(MOLECULES_CACHE), "not json either").unwrap();
        let ctx = AcquireContext::new(dir.path(), true, true);

        let mut adapter = ChemblAdapter::new();
        let err = adapter.acquire(&ctx).unwrap_err();
        assert_eq!(err.attempts.len(), 2);
    }
}
