//! End-to-end orchestrator tests: mock adapters drive the error-boundary
//! and deduplication behavior; cached snapshots drive the real adapters
//! offline.

use biograph::adapters::{AcquireContext, Adapter};
use biograph::config::{AdapterOptions, PipelineConfig, TEST_MODE_LIMIT};
use biograph::error::{AcquireError, ConfigError};
use biograph::manifest::RunManifest;
use biograph::models::{Edge, Node};
use biograph::pipeline::{Pipeline, PipelineState};
use biograph::report::AdapterStatus;
use biograph::schema::SchemaMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SCHEMA: &str = r#"
protein:
  label: Protein
  kind: node
gene:
  label: Gene
  kind: node
protein_protein_interaction:
  label: INTERACTS_WITH
  kind: edge
gene_encodes_protein:
  label: ENCODES
  kind: edge
"#;

struct MockAdapter {
    name: &'static str,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    fail_acquire: bool,
}

impl MockAdapter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            nodes: Vec::new(),
            edges: Vec::new(),
            fail_acquire: false,
        }
    }

    fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    fn failing(mut self) -> Self {
        self.fail_acquire = true;
        self
    }
}

impl Adapter for MockAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn groups(&self) -> &'static [&'static str] {
        &["mock"]
    }

    fn configure(&mut self, _options: &AdapterOptions) -> Result<(), ConfigError> {
        Ok(())
    }

    fn acquire(&mut self, _ctx: &AcquireContext) -> Result<(), AcquireError> {
        if self.fail_acquire {
            Err(AcquireError {
                adapter: self.name.to_string(),
                attempts: vec![("primary".to_string(), "connection refused".to_string())],
            })
        } else {
            Ok(())
        }
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.nodes.iter().cloned())
    }

    fn edges(&self) -> Box<dyn Iterator<Item = Edge> + '_> {
        Box::new(self.edges.iter().cloned())
    }
}

fn test_pipeline(output_root: &Path) -> Pipeline {
    let config = PipelineConfig {
        output_root: output_root.to_path_buf(),
        ..Default::default()
    };
    Pipeline::new(config, SchemaMap::from_yaml(SCHEMA).unwrap())
}

fn count_rows(dir: &Path, filename: &str) -> usize {
    fs::read_to_string(dir.join(filename))
        .unwrap_or_default()
        .lines()
        .count()
}

#[test]
fn overlapping_adapters_deduplicate_across_the_run() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    let alpha = MockAdapter::new("alpha")
        .with_node(Node::new("uniprot:P1", "protein").with("name", "p53"))
        .with_node(Node::new("uniprot:P2", "protein"));
    // Same protein again from a second source, plus one new node.
    let beta = MockAdapter::new("beta")
        .with_node(Node::new("uniprot:P1", "protein").with("name", "p53 again"))
        .with_node(Node::new("uniprot:P3", "protein"));

    let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(alpha), Box::new(beta)];
    let report = pipeline.run_adapters(&manifest, adapters).unwrap();

    assert_eq!(report.nodes_written, 3);
    assert_eq!(report.duplicates_discarded, 1);
    assert_eq!(count_rows(manifest.dir(), "Protein-part000.csv"), 3);
}

#[test]
fn one_failing_adapter_does_not_sink_the_run() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    let adapters: Vec<Box<dyn Adapter>> = vec![
        Box::new(MockAdapter::new("alpha").with_node(Node::new("uniprot:P1", "protein"))),
        Box::new(MockAdapter::new("beta").failing()),
        Box::new(MockAdapter::new("gamma").with_node(Node::new("uniprot:P2", "protein"))),
    ];

    let report = pipeline.run_adapters(&manifest, adapters).unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.failed_count(), 1);
    assert!(matches!(report.adapters[0].status, AdapterStatus::Success));
    assert!(matches!(
        report.adapters[1].status,
        AdapterStatus::Failed { .. }
    ));
    assert!(matches!(report.adapters[2].status, AdapterStatus::Success));

    // Output from the adapters that succeeded stands.
    assert_eq!(report.nodes_written, 2);
    assert!(RunManifest::is_complete(manifest.dir()));
}

#[test]
fn failure_on_the_last_adapter_still_finalizes() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    let adapters: Vec<Box<dyn Adapter>> = vec![
        Box::new(MockAdapter::new("alpha").with_node(Node::new("uniprot:P1", "protein"))),
        Box::new(MockAdapter::new("beta").failing()),
    ];

    let report = pipeline.run_adapters(&manifest, adapters).unwrap();

    // The failure transition advances the machine instead of halting it.
    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.failed_count(), 1);
    assert!(RunManifest::is_complete(manifest.dir()));
}

#[test]
fn failed_adapter_error_is_recorded_verbatim() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(MockAdapter::new("beta").failing())];
    let report = pipeline.run_adapters(&manifest, adapters).unwrap();

    match &report.adapters[0].status {
        AdapterStatus::Failed { error } => {
            assert!(error.contains("beta"));
            assert!(error.contains("connection refused"));
        }
        other => panic!("expected failed status, got {:?}", other),
    }
}

#[test]
fn dangling_edge_refs_are_counted_and_resolved_by_later_adapters() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    // Edge first, one endpoint supplied by a later adapter, one never.
    let alpha = MockAdapter::new("alpha").with_edge(Edge::new(
        "uniprot:P1",
        "uniprot:P2",
        "protein_protein_interaction",
    ));
    let beta = MockAdapter::new("beta").with_node(Node::new("uniprot:P1", "protein"));

    let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(alpha), Box::new(beta)];
    let report = pipeline.run_adapters(&manifest, adapters).unwrap();

    assert_eq!(report.edges_written, 1);
    assert_eq!(report.dangling_edge_refs, 1);
    // The edge itself is still written; import tolerates it.
    assert_eq!(count_rows(manifest.dir(), "INTERACTS_WITH-part000.csv"), 1);
}

#[test]
fn unmapped_labels_are_skipped_and_counted() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    let alpha = MockAdapter::new("alpha")
        .with_node(Node::new("uniprot:P1", "protein"))
        .with_node(Node::new("pw:WP1", "pathway"));

    let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(alpha)];
    let report = pipeline.run_adapters(&manifest, adapters).unwrap();

    assert_eq!(report.nodes_written, 1);
    assert_eq!(report.schema_skips, 1);
    assert!(!manifest.dir().join("pathway-header.csv").exists());
}

#[test]
fn header_and_part_columns_stay_aligned() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    let alpha = MockAdapter::new("alpha")
        .with_node(
            Node::new("uniprot:P1", "protein")
                .with("name", "p53")
                .with("length", 393i64),
        )
        .with_node(Node::new("uniprot:P2", "protein").with("name", "brca1"));

    let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(alpha)];
    pipeline.run_adapters(&manifest, adapters).unwrap();

    let header = fs::read_to_string(manifest.dir().join("Protein-header.csv")).unwrap();
    let part = fs::read_to_string(manifest.dir().join("Protein-part000.csv")).unwrap();
    let columns = header.trim_end().split('\t').count();
    for row in part.lines() {
        assert_eq!(row.split('\t').count(), columns);
    }
}

#[test]
fn repeated_runs_land_in_distinct_complete_directories() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());

    for _ in 0..2 {
        let manifest = RunManifest::create(root.path()).unwrap();
        let alpha = MockAdapter::new("alpha").with_node(Node::new("uniprot:P1", "protein"));
        let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(alpha)];
        pipeline.run_adapters(&manifest, adapters).unwrap();
    }

    let runs: Vec<_> = fs::read_dir(root.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    assert_eq!(runs.len(), 2);
    for run in runs {
        assert!(RunManifest::is_complete(&run.path()));
        assert!(run.path().join("neo4j-admin-import-call.sh").exists());
        assert_eq!(count_rows(&run.path(), "Protein-part000.csv"), 1);
    }
}

#[test]
fn import_script_covers_every_written_type() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());
    let manifest = RunManifest::create(root.path()).unwrap();

    let alpha = MockAdapter::new("alpha")
        .with_node(Node::new("uniprot:P1", "protein"))
        .with_node(Node::new("ncbigene:7157", "gene"))
        .with_edge(Edge::new(
            "ncbigene:7157",
            "uniprot:P1",
            "gene_encodes_protein",
        ));

    let adapters: Vec<Box<dyn Adapter>> = vec![Box::new(alpha)];
    pipeline.run_adapters(&manifest, adapters).unwrap();

    let script =
        fs::read_to_string(manifest.dir().join("neo4j-admin-import-call.sh")).unwrap();
    assert!(script.contains("--nodes=\"Protein-header.csv,Protein-part000.csv\""));
    assert!(script.contains("--nodes=\"Gene-header.csv,Gene-part000.csv\""));
    assert!(script.contains("--relationships=\"ENCODES-header.csv,ENCODES-part000.csv\""));
    assert!(!script.contains("password"));
}

// Offline scenario against the real uniprot and string adapters, fed from
// cached snapshots: protein and gene node types plus interaction edges,
// with the test-mode cap applied per source.
#[test]
fn uniprot_and_string_from_snapshots_in_test_mode() {
    let root = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    let mut uniprot_tsv =
        String::from("Entry\tProtein names\tGene (primary)\tGene Names\tOrganism\tOrganism (ID)\tLength\tGeneID\n");
    for i in 0..150 {
        uniprot_tsv.push_str(&format!(
            "P{:05}\tProtein {}\tG{}\tG{}\tHomo sapiens\t9606\t{}\t{};\n",
            i,
            i,
            i,
            i,
            100 + i,
            7000 + i
        ));
    }
    fs::write(cache.path().join("uniprot_9606.tsv"), uniprot_tsv).unwrap();

    let mut links = String::from("protein1 protein2 combined_score\n");
    for i in 0..150 {
        links.push_str(&format!(
            "9606.ENSP{:08} 9606.ENSP{:08} 900\n",
            i,
            10_000 + i
        ));
    }
    fs::write(cache.path().join("string_links_9606.txt"), links).unwrap();

    let config = PipelineConfig {
        output_root: root.path().to_path_buf(),
        cache_dir: cache.path().to_path_buf(),
        test_mode: true,
        offline: true,
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(config, SchemaMap::from_yaml(SCHEMA).unwrap());

    let report = pipeline
        .run(&["uniprot".to_string(), "string".to_string()])
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.failed_count(), 0);

    let run_dir = fs::read_dir(root.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .find(|e| e.path().is_dir())
        .unwrap()
        .path();

    // Two node types and one edge type, each with a header/part pair.
    assert!(run_dir.join("Protein-header.csv").exists());
    assert!(run_dir.join("Gene-header.csv").exists());
    assert!(run_dir.join("INTERACTS_WITH-header.csv").exists());
    assert!(run_dir.join("ENCODES-header.csv").exists());

    // Cap applies per source: 100 uniprot rows -> 100 genes and 100
    // encodes edges; 100 string rows -> 100 interactions.
    assert_eq!(count_rows(&run_dir, "Gene-part000.csv"), TEST_MODE_LIMIT);
    assert_eq!(count_rows(&run_dir, "ENCODES-part000.csv"), TEST_MODE_LIMIT);
    assert_eq!(
        count_rows(&run_dir, "INTERACTS_WITH-part000.csv"),
        TEST_MODE_LIMIT
    );
    // 100 uniprot proteins plus 200 distinct string endpoints.
    assert_eq!(count_rows(&run_dir, "Protein-part000.csv"), 300);

    assert!(RunManifest::is_complete(&run_dir));
}

#[test]
fn unknown_selection_aborts_without_output() {
    let root = TempDir::new().unwrap();
    let mut pipeline = test_pipeline(root.path());

    let err = pipeline.run(&["reactome".to_string()]).unwrap_err();
    assert!(err.to_string().contains("reactome"));
    assert_eq!(pipeline.state(), PipelineState::AbortedConfig);
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}
