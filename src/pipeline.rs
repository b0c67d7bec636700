//! Pipeline orchestrator: selection, per-adapter execution, shared
//! deduplication, batched output and the final report.
//!
//! One adapter failing (configuration or acquisition) is recorded and the
//! run moves on; output from the adapters that succeeded stands. Selection
//! errors abort before any adapter executes. Write failures abort the whole
//! run, leaving a run directory without a report file.

use crate::adapters::{self, AcquireContext, Adapter};
use crate::config::PipelineConfig;
use crate::dedup::Deduplicator;
use crate::error::{AdapterError, SelectionError};
use crate::manifest::RunManifest;
use crate::models::{Edge, Node};
use crate::report::{AdapterReport, AdapterStatus, RunReport};
use crate::schema::{EntityKind, SchemaMap};
use crate::writer::BatchWriter;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Observable run lifecycle. `Running(i)` and `Failed(i)` index into the
/// selected adapter list; `Failed` advances to the next adapter rather
/// than halting the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Selecting,
    Running(usize),
    /// Adapter `i` failed to configure or acquire; the run continues.
    Failed(usize),
    Finalizing,
    Done,
    /// Selection referenced an unknown adapter or group; nothing ran.
    AbortedConfig,
}

pub struct Pipeline {
    config: PipelineConfig,
    schema: SchemaMap,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, schema: SchemaMap) -> Self {
        Self {
            config,
            schema,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Resolve selection terms (adapter names, group tags, or `all`) to
    /// concrete adapters in registry order, each at most once. Every term
    /// must match something; otherwise the whole selection is rejected.
    pub fn select(&self, terms: &[String]) -> Result<Vec<Box<dyn Adapter>>, SelectionError> {
        let registry = adapters::registry();

        for term in terms {
            let known = term == "all"
                || registry
                    .iter()
                    .any(|d| d.name == term || d.groups.contains(&term.as_str()));
            if !known {
                let mut available: Vec<&str> = registry.iter().map(|d| d.name).collect();
                let mut groups: Vec<&str> =
                    registry.iter().flat_map(|d| d.groups).copied().collect();
                groups.sort_unstable();
                groups.dedup();
                available.extend(groups);
                return Err(SelectionError {
                    name: term.clone(),
                    available: available.join(", "),
                });
            }
        }

        let selected = registry
            .iter()
            .filter(|d| {
                terms.iter().any(|t| {
                    t == "all" || d.name == t || d.groups.contains(&t.as_str())
                })
            })
            .filter_map(|d| adapters::instantiate(d.name))
            .collect();
        Ok(selected)
    }

    /// Run the full pipeline for a selection. Returns the report that was
    /// also written into the run directory.
    pub fn run(&mut self, terms: &[String]) -> Result<RunReport> {
        self.state = PipelineState::Selecting;
        let selected = match self.select(terms) {
            Ok(selected) => selected,
            Err(e) => {
                self.state = PipelineState::AbortedConfig;
                return Err(e.into());
            }
        };
        info!(adapters = selected.len(), "Selection resolved");

        let manifest = RunManifest::create(&self.config.output_root)?;
        self.run_adapters(&manifest, selected)
    }

    /// Execute adapters against an existing manifest. Split out from `run`
    /// so callers can drive the orchestrator with their own adapter set.
    pub fn run_adapters(
        &mut self,
        manifest: &RunManifest,
        mut selected: Vec<Box<dyn Adapter>>,
    ) -> Result<RunReport> {
        let run_start = Instant::now();
        let mut writer = BatchWriter::new(manifest.dir(), self.config.batch_size);
        let mut dedup = Deduplicator::new();
        let mut reports = Vec::with_capacity(selected.len());
        let mut schema_skips = 0u64;

        for (index, adapter) in selected.iter_mut().enumerate() {
            self.state = PipelineState::Running(index);
            let name = adapter.name();
            let started = Instant::now();
            let progress = spinner(name);

            match self.prepare(adapter.as_mut()) {
                Ok(()) => {}
                Err(e) => {
                    warn!(adapter = name, error = %e, "Adapter failed, continuing with next");
                    self.state = PipelineState::Failed(index);
                    progress.finish_and_clear();
                    reports.push(AdapterReport {
                        name: name.to_string(),
                        status: AdapterStatus::Failed {
                            error: e.to_string(),
                        },
                        nodes: 0,
                        edges: 0,
                        seconds: started.elapsed().as_secs_f64(),
                    });
                    continue;
                }
            }

            let mut nodes = 0u64;
            for node in adapter.nodes() {
                match self.route_node(node, &mut dedup, &mut writer)? {
                    Routed::Written => nodes += 1,
                    Routed::Duplicate => {}
                    Routed::Unmapped => schema_skips += 1,
                }
            }
            let mut edges = 0u64;
            for edge in adapter.edges() {
                match self.route_edge(edge, &mut dedup, &mut writer)? {
                    Routed::Written => edges += 1,
                    Routed::Duplicate => {}
                    Routed::Unmapped => schema_skips += 1,
                }
            }
            progress.finish_and_clear();

            let skipped = adapter.skipped_fields();
            let status = if skipped > 0 {
                AdapterStatus::Partial { skipped }
            } else {
                AdapterStatus::Success
            };
            let seconds = started.elapsed().as_secs_f64();
            info!(adapter = name, nodes, edges, seconds, "Adapter finished");
            reports.push(AdapterReport {
                name: name.to_string(),
                status,
                nodes,
                edges,
                seconds,
            });
        }

        self.state = PipelineState::Finalizing;
        let summary = writer.finalize()?;
        manifest.write_import_script(&summary, "neo4j")?;

        let report = RunReport {
            run_id: manifest.run_id().to_string(),
            adapters: reports,
            nodes_written: summary.total_rows(EntityKind::Node),
            edges_written: summary.total_rows(EntityKind::Edge),
            duplicates_discarded: dedup.duplicate_nodes() + dedup.duplicate_edges(),
            dangling_edge_refs: dedup.dangling_refs(),
            schema_skips,
            seconds: run_start.elapsed().as_secs_f64(),
        };
        manifest.write_report(&report)?;
        self.state = PipelineState::Done;
        Ok(report)
    }

    /// Configure and acquire. Both failure kinds are adapter-scoped.
    fn prepare(&self, adapter: &mut dyn Adapter) -> Result<(), AdapterError> {
        let options = self.config.options_for(adapter.name());
        adapter.configure(&options)?;
        let ctx = AcquireContext::new(
            self.config.cache_dir.clone(),
            options.use_cache,
            self.config.offline,
        );
        adapter.acquire(&ctx)?;
        Ok(())
    }

    fn route_node(
        &self,
        mut node: Node,
        dedup: &mut Deduplicator,
        writer: &mut BatchWriter,
    ) -> Result<Routed> {
        let entry = match self.schema.resolve(&node.label) {
            Ok(entry) if entry.kind == EntityKind::Node => entry,
            Ok(entry) => {
                debug!(label = %node.label, mapped = %entry.label, "Node label maps to an edge type, skipping");
                return Ok(Routed::Unmapped);
            }
            Err(e) => {
                debug!(label = %e.label, "Unmapped node label, skipping");
                return Ok(Routed::Unmapped);
            }
        };
        if !dedup.accept_node(&node) {
            return Ok(Routed::Duplicate);
        }
        if let Some(allowed) = &entry.properties {
            node.properties.retain(|k, _| allowed.contains(k));
        }
        writer.write_node(&entry.label, node)?;
        Ok(Routed::Written)
    }

    fn route_edge(
        &self,
        mut edge: Edge,
        dedup: &mut Deduplicator,
        writer: &mut BatchWriter,
    ) -> Result<Routed> {
        let entry = match self.schema.resolve(&edge.label) {
            Ok(entry) if entry.kind == EntityKind::Edge => entry,
            Ok(entry) => {
                debug!(label = %edge.label, mapped = %entry.label, "Edge label maps to a node type, skipping");
                return Ok(Routed::Unmapped);
            }
            Err(e) => {
                debug!(label = %e.label, "Unmapped edge label, skipping");
                return Ok(Routed::Unmapped);
            }
        };
        if !dedup.accept_edge(&edge) {
            return Ok(Routed::Duplicate);
        }
        if let Some(allowed) = &entry.properties {
            edge.properties.retain(|k, _| allowed.contains(k));
        }
        writer.write_edge(&entry.label, edge)?;
        Ok(Routed::Written)
    }
}

enum Routed {
    Written,
    Duplicate,
    Unmapped,
}

fn spinner(adapter: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(adapter.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
