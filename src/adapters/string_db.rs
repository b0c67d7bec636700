//! STRING adapter: protein-protein interaction edges from the STRING bulk
//! download, plus reference protein nodes for the interaction endpoints.
//!
//! The links file is space-separated with a `protein1 protein2
//! combined_score` header. Scores arrive as integers in [0, 1000] and are
//! normalized to [0, 1] before the configured threshold is applied.

use super::{record_limit, validate_organism, validate_threshold, AcquireContext, Adapter};
use crate::config::{AdapterOptions, DEFAULT_ORGANISM, DEFAULT_SCORE_THRESHOLD};
use crate::error::{AcquireError, ConfigError};
use crate::fallback::{self, Strategy};
use crate::models::{curie, Edge, Node};
use rustc_hash::FxHashSet;
use std::cell::Cell;

const LINKS_VERSION: &str = "v12.0";

struct Interaction {
    source: String,
    target: String,
    score: f64,
}

pub struct StringAdapter {
    organism: String,
    score_threshold: f64,
    test_mode: bool,
    raw: Option<String>,
    skipped_fields: Cell<u64>,
}

impl StringAdapter {
    pub fn new() -> Self {
        Self {
            organism: DEFAULT_ORGANISM.to_string(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            test_mode: false,
            raw: None,
            skipped_fields: Cell::new(0),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_raw(mut self, raw: &str) -> Self {
        self.raw = Some(raw.to_string());
        self
    }

    fn cache_filename(&self) -> String {
        format!("string_links_{}.txt", self.organism)
    }

    /// Parsed interactions passing the score threshold, capped by test
    /// mode. The cap applies to source rows so a test run reads a bounded
    /// prefix of the file regardless of how the threshold filters it.
    fn interactions(&self) -> impl Iterator<Item = Interaction> + '_ {
        self.raw
            .as_deref()
            .unwrap_or("")
            .lines()
            .skip(1) // header line
            .filter(|l| !l.trim().is_empty())
            .take(record_limit(self.test_mode))
            .filter_map(move |line| self.parse_line(line))
    }

    fn parse_line(&self, line: &str) -> Option<Interaction> {
        let mut cols = line.split_ascii_whitespace();
        let (Some(a), Some(b), Some(raw_score)) = (cols.next(), cols.next(), cols.next()) else {
            self.skipped_fields.set(self.skipped_fields.get() + 1);
            return None;
        };
        let Ok(score) = raw_score.parse::<u32>() else {
            self.skipped_fields.set(self.skipped_fields.get() + 1);
            return None;
        };
        let score = f64::from(score.min(1000)) / 1000.0;
        if score < self.score_threshold {
            return None;
        }
        let source = self.protein_id(a);
        let target = self.protein_id(b);
        if source == target {
            return None; // self-interaction
        }
        Some(Interaction {
            source,
            target,
            score,
        })
    }

    /// `9606.ENSP00000000233` -> `ensembl:ENSP00000000233`.
    fn protein_id(&self, raw: &str) -> String {
        let prefix = format!("{}.", self.organism);
        curie("ensembl", raw.strip_prefix(&prefix).unwrap_or(raw))
    }
}

impl Default for StringAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for StringAdapter {
    fn name(&self) -> &'static str {
        "string"
    }

    fn groups(&self) -> &'static [&'static str] {
        &["proteins", "interactions"]
    }

    fn configure(&mut self, options: &AdapterOptions) -> Result<(), ConfigError> {
        if let Some(organism) = &options.organism {
            self.organism = validate_organism(organism)?;
        }
        if let Some(threshold) = options.score_threshold {
            self.score_threshold = validate_threshold(threshold)?;
        }
        self.test_mode = options.test_mode;
        Ok(())
    }

    fn acquire(&mut self, ctx: &AcquireContext) -> Result<(), AcquireError> {
        if self.raw.is_some() {
            return Ok(());
        }

        let primary_url = format!(
            "https://stringdb-downloads.org/download/protein.links.{v}/{org}.protein.links.{v}.txt.gz",
            v = LINKS_VERSION,
            org = self.organism
        );
        let mirror_url = format!(
            "https://stringdb-static.org/download/protein.links.{v}/{org}.protein.links.{v}.txt.gz",
            v = LINKS_VERSION,
            org = self.organism
        );
        let cache_file = self.cache_filename();

        let strategies = [
            Strategy::new("bulk-download", || ctx.http_get_gzipped(&primary_url)),
            Strategy::new("mirror-download", || ctx.http_get_gzipped(&mirror_url)),
            Strategy::new("cache-snapshot", || ctx.read_cached(&cache_file)),
        ];

        let raw = fallback::resolve(self.name(), &strategies)?;
        ctx.store_cache(&cache_file, &raw);
        self.raw = Some(raw);
        Ok(())
    }

    /// Reference nodes for interaction endpoints, each id emitted once.
    /// Endpoints already contributed by a richer source deduplicate away
    /// downstream.
    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        let mut seen = FxHashSet::default();
        Box::new(
            self.interactions()
                .flat_map(|i| [i.source, i.target])
                .filter(move |id| seen.insert(id.clone()))
                .map(|id| Node::new(id, "protein").with("source", "string")),
        )
    }

    fn edges(&self) -> Box<dyn Iterator<Item = Edge> + '_> {
        Box::new(self.interactions().map(|i| {
            Edge::new(i.source, i.target, "protein_protein_interaction")
                .with("score", i.score)
                .with("source", "string")
        }))
    }

    fn skipped_fields(&self) -> u64 {
        self.skipped_fields.get()
    }
}
