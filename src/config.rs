//! Pipeline constants and the explicit configuration structure.
//!
//! Nothing in the core reads process-wide state; the binary builds one
//! `PipelineConfig` at startup and passes it by reference.

use std::collections::HashMap;
use std::path::PathBuf;

/// Maximum records an adapter may take from its source in test mode.
/// Truncation is deterministic: first N in source order.
pub const TEST_MODE_LIMIT: usize = 100;

/// Entities buffered per output type before a part file is flushed.
pub const BATCH_SIZE: usize = 10_000;

/// Buffer size for CSV part writers.
pub const CSV_BUFFER_SIZE: usize = 128 * 1024;

/// Default root under which timestamped run directories are created.
pub const DEFAULT_OUTPUT_ROOT: &str = "biograph-out";

/// Default schema mapping file.
pub const DEFAULT_SCHEMA_PATH: &str = "config/schema.yaml";

/// Default directory for cached source snapshots.
pub const DEFAULT_CACHE_DIR: &str = ".cache";

/// NCBI taxonomy id for human, the default organism filter.
pub const DEFAULT_ORGANISM: &str = "9606";

/// Default normalized combined-score threshold for interaction sources.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.4;

/// Run-level configuration, constructed once per process.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_root: PathBuf,
    pub cache_dir: PathBuf,
    pub schema_path: PathBuf,
    /// Truncate every adapter to `TEST_MODE_LIMIT` records.
    pub test_mode: bool,
    /// Skip network strategies entirely; only cached snapshots are used.
    pub offline: bool,
    pub batch_size: usize,
    /// Per-adapter option overrides, keyed by adapter name.
    pub adapter_options: HashMap<String, AdapterOptions>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            test_mode: false,
            offline: false,
            batch_size: BATCH_SIZE,
            adapter_options: HashMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Options for one adapter: the recorded override merged with run-level
    /// flags. Test mode is sticky; an override cannot switch it off.
    pub fn options_for(&self, adapter: &str) -> AdapterOptions {
        let mut opts = self
            .adapter_options
            .get(adapter)
            .cloned()
            .unwrap_or_default();
        opts.test_mode |= self.test_mode;
        opts
    }
}

/// Recognized per-adapter options. Adapters validate these in `configure`
/// and ignore options that do not apply to their source.
#[derive(Debug, Clone)]
pub struct AdapterOptions {
    /// NCBI taxonomy id, e.g. "9606".
    pub organism: Option<String>,
    /// Normalized confidence threshold in [0, 1].
    pub score_threshold: Option<f64>,
    /// Minimum evidence level (source-specific scale, e.g. ChEMBL max_phase).
    pub evidence_filter: Option<u32>,
    pub test_mode: bool,
    /// Reuse cached snapshots instead of re-downloading.
    pub use_cache: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            organism: None,
            score_threshold: None,
            evidence_filter: None,
            test_mode: false,
            use_cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_for_unknown_adapter_is_default() {
        let config = PipelineConfig::default();
        let opts = config.options_for("uniprot");
        assert!(opts.organism.is_none());
        assert!(opts.use_cache);
        assert!(!opts.test_mode);
    }

    #[test]
    fn run_level_test_mode_is_sticky() {
        let mut config = PipelineConfig {
            test_mode: true,
            ..Default::default()
        };
        config.adapter_options.insert(
            "string".into(),
            AdapterOptions {
                score_threshold: Some(0.7),
                test_mode: false,
                ..Default::default()
            },
        );
        let opts = config.options_for("string");
        assert!(opts.test_mode);
        assert_eq!(opts.score_threshold, Some(0.7));
    }
}
