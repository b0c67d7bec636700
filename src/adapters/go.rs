//! Gene Ontology adapter: term nodes and hierarchy edges parsed from the
//! go-basic OBO release.
//!
//! Only `[Term]` stanzas are read. Obsolete terms are dropped; `is_a` and
//! `relationship: part_of` lines become hierarchy edges. Other relationship
//! types (regulates, occurs_in) are out of scope for the basic graph.

use super::{record_limit, AcquireContext, Adapter};
use crate::config::AdapterOptions;
use crate::error::{AcquireError, ConfigError, StrategyError};
use crate::fallback::{self, Strategy};
use crate::models::{clean_field, Edge, Node};
use std::cell::Cell;

const OBO_URL: &str = "https://purl.obolibrary.org/obo/go/go-basic.obo";
const OBO_MIRROR_URL: &str = "http://current.geneontology.org/ontology/go-basic.obo";
const OBO_CACHE: &str = "go-basic.obo";

#[derive(Debug, Default)]
struct Term {
    id: String,
    name: Option<String>,
    namespace: Option<String>,
    definition: Option<String>,
    is_a: Vec<String>,
    part_of: Vec<String>,
}

pub struct GoAdapter {
    test_mode: bool,
    raw: Option<String>,
    skipped_fields: Cell<u64>,
}

impl GoAdapter {
    pub fn new() -> Self {
        Self {
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

    /// Non-obsolete terms in file order, capped by test mode.
    fn terms(&self) -> impl Iterator<Item = Term> + '_ {
        self.raw
            .as_deref()
            .unwrap_or("")
            .split("\n\n")
            .filter(|stanza| stanza.trim_start().starts_with("[Term]"))
            .filter_map(move |stanza| self.parse_term(stanza))
            .take(record_limit(self.test_mode))
    }

    fn parse_term(&self, stanza: &str) -> Option<Term> {
        let mut term = Term::default();
        for line in stanza.lines() {
            let Some((tag, rest)) = line.split_once(": ") else {
                continue;
            };
            match tag {
                "id" => term.id = rest.trim().to_string(),
                "name" => term.name = Some(rest.trim().to_string()),
                "namespace" => term.namespace = Some(rest.trim().to_string()),
                "def" => term.definition = Some(strip_def(rest)),
                "is_a" => {
                    if let Some(target) = target_id(rest) {
                        term.is_a.push(target);
                    } else {
                        self.skipped_fields.set(self.skipped_fields.get() + 1);
                    }
                }
                "relationship" => {
                    if let Some(rest) = rest.trim().strip_prefix("part_of ") {
                        if let Some(target) = target_id(rest) {
                            term.part_of.push(target);
                        } else {
                            self.skipped_fields.set(self.skipped_fields.get() + 1);
                        }
                    }
                }
                "is_obsolete" => {
                    if rest.trim() == "true" {
                        return None;
                    }
                }
                _ => {}
            }
        }
        if term.id.is_empty() {
            self.skipped_fields.set(self.skipped_fields.get() + 1);
            return None;
        }
        Some(term)
    }
}

/// `GO:0000001 ! mitochondrion inheritance` -> `GO:0000001`.
fn target_id(rest: &str) -> Option<String> {
    let id = rest.split('!').next()?.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// `"The production of..." [GOC:ai]` -> `The production of...`.
fn strip_def(rest: &str) -> String {
    let rest = rest.trim();
    match (rest.find('"'), rest.rfind('"')) {
        (Some(start), Some(end)) if end > start => rest[start + 1..end].to_string(),
        _ => rest.to_string(),
    }
}

impl Default for GoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for GoAdapter {
    fn name(&self) -> &'static str {
        "go"
    }

    fn groups(&self) -> &'static [&'static str] {
        &["ontologies"]
    }

    fn configure(&mut self, options: &AdapterOptions) -> Result<(), ConfigError> {
        self.test_mode = options.test_mode;
        Ok(())
    }

    fn acquire(&mut self, ctx: &AcquireContext) -> Result<(), AcquireError> {
        if self.raw.is_some() {
            return Ok(());
        }

        let strategies = [
            Strategy::new("obo-download", || {
                let raw = ctx.http_get(OBO_URL)?;
                require_obo(&raw)?;
                Ok(raw)
            }),
            Strategy::new("obo-mirror", || {
                let raw = ctx.http_get(OBO_MIRROR_URL)?;
                require_obo(&raw)?;
                Ok(raw)
            }),
            Strategy::new("cache-snapshot", || ctx.read_cached(OBO_CACHE)),
        ];

        let raw = fallback::resolve(self.name(), &strategies)?;
        ctx.store_cache(OBO_CACHE, &raw);
        self.raw = Some(raw);
        Ok(())
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = Node> + '_> {
        Box::new(self.terms().map(|term| {
            let mut node = Node::new(term.id, "go_term").with("source", "go");
            if let Some(name) = term.name {
                node = node.with("name", clean_field(&name));
            }
            if let Some(namespace) = term.namespace {
                node = node.with("namespace", namespace);
            }
            if let Some(definition) = term.definition {
                node = node.with("definition", clean_field(&definition));
            }
            node
        }))
    }

    fn edges(&self) -> Box<dyn Iterator<Item = Edge> + '_> {
        Box::new(self.terms().flat_map(|term| {
            let mut out = Vec::with_capacity(term.is_a.len() + term.part_of.len());
            for parent in term.is_a {
                out.push(Edge::new(term.id.clone(), parent, "go_is_a").with("source", "go"));
            }
            for whole in term.part_of {
                out.push(Edge::new(term.id.clone(), whole, "go_part_of").with("source", "go"));
            }
            out
        }))
    }

    fn skipped_fields(&self) -> u64 {
        self.skipped_fields.get()
    }
}

fn require_obo(raw: &str) -> Result<(), StrategyError> {
    if raw.contains("[Term]") {
        Ok(())
    } else {
        Err(StrategyError::Parse(
            "response contains no OBO term stanzas".into(),
        ))
    }
}
