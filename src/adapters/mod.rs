//! Adapters: one per biological data source.
//!
//! Heterogeneous backends (REST endpoints, bulk file downloads, ontology
//! files) all satisfy the same capability contract -- configure, acquire,
//! stream nodes, stream edges -- so the orchestrator composes them without
//! knowing their internals. Acquisition goes through the fallback resolver
//! with a per-adapter strategy list; raw payloads are cached once acquired
//! so repeated `acquire` calls are no-ops.
//!
//! Built-in adapters:
//!
//! - [`uniprot`] -- UniProt REST (tab-separated stream), protein/gene nodes
//! - [`string_db`] -- STRING bulk download, interaction edges
//! - [`chembl`] -- ChEMBL REST (JSON), drug/compound nodes and target edges
//! - [`go`] -- Gene Ontology OBO file, term nodes and hierarchy edges

pub mod chembl;
pub mod go;
pub mod string_db;
pub mod uniprot;

use crate::config::{AdapterOptions, TEST_MODE_LIMIT};
use crate::error::{AcquireError, ConfigError, StrategyError};
use crate::models::{Edge, Node};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Common contract every data source adapter implements.
///
/// `nodes` and `edges` return lazy, finite, non-restartable iterators that
/// parse the acquired payload on the fly; adapters never materialize the
/// full entity set in memory.
pub trait Adapter {
    fn name(&self) -> &'static str;

    /// Group tags for combination selection (`proteins`, `drugs`, ...).
    fn groups(&self) -> &'static [&'static str];

    /// Validate and store options. Invalid values (threshold outside
    /// [0, 1], malformed organism code) fail the adapter, not the run.
    fn configure(&mut self, options: &AdapterOptions) -> Result<(), ConfigError>;

    /// Obtain raw data via the fallback resolver. Idempotent: a second
    /// call reuses the payload already held.
    fn acquire(&mut self, ctx: &AcquireContext) -> Result<(), AcquireError>;

    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_>;

    fn edges(&self) -> Box<dyn Iterator<Item = Edge> + '_>;

    /// Fields skipped due to recoverable per-field failures, for the
    /// partial-status accounting in the report.
    fn skipped_fields(&self) -> u64 {
        0
    }
}

/// Record cap honored by every adapter: first N in source order, so test
/// runs are fast and reproducible.
pub fn record_limit(test_mode: bool) -> usize {
    if test_mode {
        TEST_MODE_LIMIT
    } else {
        usize::MAX
    }
}

/// Shared download/cache plumbing handed to `acquire`.
///
/// Network strategies honor `offline`; the cache-snapshot strategy reads
/// and writes under `cache_dir`. Credentials for authenticated sources are
/// read from the process environment by the strategy that needs them and
/// never persisted.
pub struct AcquireContext {
    cache_dir: PathBuf,
    use_cache: bool,
    offline: bool,
}

impl AcquireContext {
    pub fn new(cache_dir: impl Into<PathBuf>, use_cache: bool, offline: bool) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            use_cache,
            offline,
        }
    }

    pub fn cache_path(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Cache-snapshot strategy body: only valid when caching is enabled
    /// and a snapshot exists.
    pub fn read_cached(&self, filename: &str) -> Result<String, StrategyError> {
        if !self.use_cache {
            return Err(StrategyError::CacheMiss("caching disabled".into()));
        }
        let path = self.cache_path(filename);
        if !path.exists() {
            return Err(StrategyError::CacheMiss(format!(
                "no snapshot at {}",
                path.display()
            )));
        }
        Ok(fs::read_to_string(path)?)
    }

    /// Best-effort write-through after a successful network fetch so the
    /// cache strategy can serve the next run.
    pub fn store_cache(&self, filename: &str, data: &str) {
        if !self.use_cache {
            return;
        }
        if let Err(e) = fs::create_dir_all(&self.cache_dir)
            .and_then(|_| fs::write(self.cache_path(filename), data))
        {
            warn!(filename, error = %e, "Failed to store cache snapshot");
        } else {
            debug!(filename, "Cache snapshot stored");
        }
    }

    pub fn http_get(&self, url: &str) -> Result<String, StrategyError> {
        let response = self.send(url)?;
        Ok(response.text()?)
    }

    /// Fetch a gzip-compressed payload and decompress it.
    pub fn http_get_gzipped(&self, url: &str) -> Result<String, StrategyError> {
        let response = self.send(url)?;
        let bytes = response.bytes()?;
        let mut decoder = GzDecoder::new(bytes.as_ref());
        let mut out = String::new();
        decoder
            .read_to_string(&mut out)
            .map_err(|e| StrategyError::Parse(format!("gzip decode failed: {}", e)))?;
        Ok(out)
    }

    fn send(&self, url: &str) -> Result<reqwest::blocking::Response, StrategyError> {
        if self.offline {
            return Err(StrategyError::Offline);
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("biograph/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(300))
            .build()?;
        let response = client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

/// Static description of a registered adapter, used for selection and
/// `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDescriptor {
    pub name: &'static str,
    pub groups: &'static [&'static str],
    pub description: &'static str,
}

/// Every built-in adapter, in the order an `all` selection runs them.
/// Node-producing adapters come first so interaction edges usually find
/// their endpoints already emitted.
pub fn registry() -> Vec<AdapterDescriptor> {
    vec![
        AdapterDescriptor {
            name: "uniprot",
            groups: &["proteins"],
            description: "UniProt proteins and genes (REST)",
        },
        AdapterDescriptor {
            name: "chembl",
            groups: &["drugs"],
            description: "ChEMBL drugs, compounds and target links (REST)",
        },
        AdapterDescriptor {
            name: "go",
            groups: &["ontologies"],
            description: "Gene Ontology terms and hierarchy (OBO)",
        },
        AdapterDescriptor {
            name: "string",
            groups: &["proteins", "interactions"],
            description: "STRING protein-protein interactions (bulk download)",
        },
    ]
}

/// Construct an adapter by registry name.
pub fn instantiate(name: &str) -> Option<Box<dyn Adapter>> {
    match name {
        "uniprot" => Some(Box::new(uniprot::UniprotAdapter::new())),
        "chembl" => Some(Box::new(chembl::ChemblAdapter::new())),
        "go" => Some(Box::new(go::GoAdapter::new())),
        "string" => Some(Box::new(string_db::StringAdapter::new())),
        _ => None,
    }
}

/// Shared validation: normalized confidence thresholds live in [0, 1].
pub(crate) fn validate_threshold(threshold: f64) -> Result<f64, ConfigError> {
    if !(0.0..=1.0).contains(&threshold) || threshold.is_nan() {
        return Err(ConfigError(format!(
            "score_threshold must be in [0, 1], got {}",
            threshold
        )));
    }
    Ok(threshold)
}

/// Shared validation: organism codes are numeric NCBI taxonomy ids.
pub(crate) fn validate_organism(organism: &str) -> Result<String, ConfigError> {
    if organism.is_empty() || !organism.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError(format!(
            "organism must be a numeric NCBI taxonomy id, got '{}'",
            organism
        )));
    }
    Ok(organism.to_string())
}
