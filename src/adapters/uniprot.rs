//! UniProt adapter: protein and gene nodes from the UniProt REST API.
//!
//! Acquisition requests a tab-separated export with a fixed field list, so
//! rows parse by position. Fallbacks: the full stream endpoint, then the
//! paged search endpoint (degraded: first page only), then a cached
//! snapshot.

use super::{record_limit, validate_organism, AcquireContext, Adapter};
use crate::config::{AdapterOptions, DEFAULT_ORGANISM};
use crate::error::{AcquireError, ConfigError, StrategyError};
use crate::fallback::{self, Strategy};
use crate::models::{clean_field, curie, Edge, Node};
use std::cell::Cell;
use tracing::debug;

const FIELDS: &str = "accession,protein_name,gene_primary,gene_names,organism_name,organism_id,length,xref_geneid";
const STREAM_URL: &str = "https://rest.uniprot.org/uniprotkb/stream";
const SEARCH_URL: &str = "https://rest.uniprot.org/uniprotkb/search";

// Positional indices matching `FIELDS`.
const COL_ACCESSION: usize = 0;
const COL_PROTEIN_NAME: usize = 1;
const COL_GENE_PRIMARY: usize = 2;
const COL_GENE_NAMES: usize = 3;
const COL_ORGANISM_NAME: usize = 4;
const COL_ORGANISM_ID: usize = 5;
const COL_LENGTH: usize = 6;
const COL_XREF_GENEID: usize = 7;

pub struct UniprotAdapter {
    organism: String,
    test_mode: bool,
    raw: Option<String>,
    skipped_fields: Cell<u64>,
}

impl UniprotAdapter {
    pub fn new() -> Self {
        Self {
            organism: DEFAULT_ORGANISM.to_string(),
            test_mode: false,
            raw: None,
            skipped_fields: Cell::new(0),
        }
    }

    /// Inject a pre-acquired TSV payload. Test seam; the pipeline always
    /// goes through `acquire`.
    #[cfg(test)]
    pub(crate) fn with_raw(mut self, raw: &str) -> Self {
        self.raw = Some(raw.to_string());
        self
    }

    fn query(&self) -> String {
        format!("organism_id:{}+AND+reviewed:true", self.organism)
    }

    fn cache_filename(&self) -> String {
        format!("uniprot_{}.tsv", self.organism)
    }

    /// Data rows in source order, capped by test mode.
    fn rows(&self) -> impl Iterator<Item = Vec<&str>> {
        self.raw
            .as_deref()
            .unwrap_or("")
            .lines()
            .skip(1) // header line
            .filter(|l| !l.trim().is_empty())
            .take(record_limit(self.test_mode))
            .map(|line| line.split('\t').collect())
    }

    /// Malformed or missing-required fields only; empty optional columns
    /// are normal UniProt output, not degradation.
    fn skip_field(&self, name: &str) {
        debug!(field = name, "UniProt field unusable, skipping");
        self.skipped_fields.set(self.skipped_fields.get() + 1);
    }

    fn protein_node(&self, row: &[&str]) -> Option<Node> {
        let Some(accession) = field(row, COL_ACCESSION) else {
            self.skip_field("accession");
            return None;
        };
        let mut node = Node::new(curie("uniprot", accession), "protein").with("source", "uniprot");

        if let Some(name) = field(row, COL_PROTEIN_NAME) {
            node = node.with("name", clean_field(name));
        }
        if let Some(genes) = field(row, COL_GENE_NAMES) {
            let list: Vec<String> = genes.split_whitespace().map(clean_field).collect();
            if !list.is_empty() {
                node = node.with("gene_names", list);
            }
        }
        if let Some(organism) = field(row, COL_ORGANISM_NAME) {
            node = node.with("organism", clean_field(organism));
        }
        if let Some(raw) = field(row, COL_ORGANISM_ID) {
            match raw.parse::<i64>() {
                Ok(id) => node = node.with("organism_id", id),
                Err(_) => self.skip_field("organism_id"),
            }
        }
        if let Some(raw) = field(row, COL_LENGTH) {
            match raw.replace(',', "").parse::<i64>() {
                Ok(len) => node = node.with("length", len),
                Err(_) => self.skip_field("length"),
            }
        }
        Some(node)
    }

    fn gene_ids<'a>(&self, row: &[&'a str]) -> Vec<&'a str> {
        row.get(COL_XREF_GENEID)
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn gene_nodes(&self, row: &[&str]) -> Vec<Node> {
        let symbol = row
            .get(COL_GENE_PRIMARY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());
        self.gene_ids(row)
            .into_iter()
            .map(|gene_id| {
                let mut node =
                    Node::new(curie("ncbigene", gene_id), "gene").with("source", "uniprot");
                if let Some(symbol) = symbol {
                    node = node.with("symbol", clean_field(symbol));
                }
                node
            })
            .collect()
    }
}

impl Default for UniprotAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for UniprotAdapter {
    fn name(&self) -> &'static str {
        "uniprot"
    }

    fn groups(&self) -> &'static [&'static str] {
        &["proteins"]
    }

    fn configure(&mut self, options: &AdapterOptions) -> Result<(), ConfigError> {
        if let Some(organism) = &options.organism {
            self.organism = validate_organism(organism)?;
        }
        if let Some(threshold) = options.score_threshold {
            // Not used by this source, but still validated so a typo'd
            // configuration fails loudly instead of being ignored.
            super::validate_threshold(threshold)?;
        }
        self.test_mode = options.test_mode;
        Ok(())
    }

    fn acquire(&mut self, ctx: &AcquireContext) -> Result<(), AcquireError> {
        if self.raw.is_some() {
            return Ok(());
        }

        let stream_url = format!(
            "{}?format=tsv&fields={}&query={}",
            STREAM_URL,
            FIELDS,
            self.query()
        );
        let search_url = format!(
            "{}?format=tsv&fields={}&size=500&query={}",
            SEARCH_URL,
            FIELDS,
            self.query()
        );
        let cache_file = self.cache_filename();

        let strategies = [
            Strategy::new("rest-stream", || {
                let raw = ctx.http_get(&stream_url)?;
                require_tsv(&raw)?;
                Ok(raw)
            }),
            Strategy::new("rest-search-page", || {
                let raw = ctx.http_get(&search_url)?;
                require_tsv(&raw)?;
                Ok(raw)
            }),
            Strategy::new("cache-snapshot", || ctx.read_cached(&cache_file)),
        ];

        let raw = fallback::resolve(self.name(), &strategies)?;
        ctx.store_cache(&cache_file, &raw);
        self.raw = Some(raw);
        Ok(())
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.rows().flat_map(|row| {
            let mut out = Vec::new();
            if let Some(protein) = self.protein_node(&row) {
                out.push(protein);
            }
            out.extend(self.gene_nodes(&row));
            out
        }))
    }

    fn edges(&self) -> Box<dyn Iterator<Item = Edge> + '_> {
        Box::new(self.rows().flat_map(|row| {
            let Some(accession) = row.get(COL_ACCESSION).filter(|a| !a.trim().is_empty()) else {
                return Vec::new();
            };
            let protein_id = curie("uniprot", accession.trim());
            self.gene_ids(&row)
                .into_iter()
                .map(|gene_id| {
                    Edge::new(
                        curie("ncbigene", gene_id),
                        protein_id.clone(),
                        "gene_encodes_protein",
                    )
                    .with("source", "uniprot")
                })
                .collect()
        }))
    }

    fn skipped_fields(&self) -> u64 {
        self.skipped_fields.get()
    }
}

/// Trimmed, non-empty column value.
fn field<'a>(row: &[&'a str], index: usize) -> Option<&'a str> {
    row.get(index).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Reject payloads that are clearly not the requested TSV export (HTML
/// error pages, JSON error envelopes) so the fallback chain moves on.
fn require_tsv(raw: &str) -> Result<(), StrategyError> {
    let first = raw.lines().next().unwrap_or("");
    if !first.contains('\t') {
        return Err(StrategyError::Parse(
            "response is not the expected tab-separated export".into(),
        ));
    }
    Ok(())
}
