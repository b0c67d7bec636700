//! Batched, per-type CSV output with header/data separation.
//!
//! Entities accumulate in memory per output type and flush as sequentially
//! numbered part files (`Protein-part000.csv`, `Protein-part001.csv`, ...).
//! The header file (`Protein-header.csv`) is written exactly once per type,
//! on first flush, with columns inferred from the union of property keys in
//! the first batch. Later records missing a property serialize an empty
//! field so columns never shift; property keys that first appear after
//! header inference are dropped with a count.
//!
//! Files are tab-delimited with `|` as the array delimiter, the layout the
//! generated neo4j-admin import call declares.

use crate::config::CSV_BUFFER_SIZE;
use crate::error::WriteError;
use crate::models::{Edge, Node, Properties};
use crate::schema::EntityKind;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Per-type counts returned by `finalize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCounts {
    pub kind: EntityKind,
    pub rows: u64,
    pub parts: u32,
    pub dropped_properties: u64,
}

/// Summary of everything the writer produced, keyed by output label.
#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    pub per_type: BTreeMap<String, TypeCounts>,
}

impl WriteSummary {
    pub fn total_rows(&self, kind: EntityKind) -> u64 {
        self.per_type
            .values()
            .filter(|c| c.kind == kind)
            .map(|c| c.rows)
            .sum()
    }
}

enum Batch {
    Nodes(Vec<Node>),
    Edges(Vec<Edge>),
}

impl Batch {
    fn len(&self) -> usize {
        match self {
            Batch::Nodes(v) => v.len(),
            Batch::Edges(v) => v.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct TypeState {
    /// Property columns, fixed once the header is written.
    columns: Option<Vec<String>>,
    batch: Batch,
    next_part: u32,
    rows_written: u64,
    dropped_properties: u64,
}

impl TypeState {
    fn kind(&self) -> EntityKind {
        match self.batch {
            Batch::Nodes(_) => EntityKind::Node,
            Batch::Edges(_) => EntityKind::Edge,
        }
    }
}

pub struct BatchWriter {
    dir: PathBuf,
    batch_size: usize,
    types: HashMap<String, TypeState>,
}

impl BatchWriter {
    pub fn new(dir: impl Into<PathBuf>, batch_size: usize) -> Self {
        Self {
            dir: dir.into(),
            batch_size: batch_size.max(1),
            types: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Buffer a node under `type_label` (the schema-resolved output label).
    pub fn write_node(&mut self, type_label: &str, node: Node) -> Result<(), WriteError> {
        let state = self.types.entry(type_label.to_string()).or_insert(TypeState {
            columns: None,
            batch: Batch::Nodes(Vec::new()),
            next_part: 0,
            rows_written: 0,
            dropped_properties: 0,
        });
        match &mut state.batch {
            Batch::Nodes(batch) => batch.push(node),
            Batch::Edges(_) => {
                // A label cannot host both kinds; the schema map guarantees
                // this, so reaching here is a logic error upstream.
                panic!("type '{}' already holds edges", type_label);
            }
        }
        if state.batch.len() >= self.batch_size {
            Self::flush_type(&self.dir, self.batch_size, type_label, state)?;
        }
        Ok(())
    }

    /// Buffer an edge under `type_label`.
    pub fn write_edge(&mut self, type_label: &str, edge: Edge) -> Result<(), WriteError> {
        let state = self.types.entry(type_label.to_string()).or_insert(TypeState {
            columns: None,
            batch: Batch::Edges(Vec::new()),
            next_part: 0,
            rows_written: 0,
            dropped_properties: 0,
        });
        match &mut state.batch {
            Batch::Edges(batch) => batch.push(edge),
            Batch::Nodes(_) => {
                panic!("type '{}' already holds nodes", type_label);
            }
        }
        if state.batch.len() >= self.batch_size {
            Self::flush_type(&self.dir, self.batch_size, type_label, state)?;
        }
        Ok(())
    }

    /// Flush all partial batches and return per-type counts.
    pub fn finalize(mut self) -> Result<WriteSummary, WriteError> {
        let mut summary = WriteSummary::default();
        let mut types: Vec<_> = self.types.drain().collect();
        types.sort_by(|a, b| a.0.cmp(&b.0));

        for (label, mut state) in types {
            if !state.batch.is_empty() {
                Self::flush_type(&self.dir, self.batch_size, &label, &mut state)?;
            }
            if state.dropped_properties > 0 {
                warn!(
                    label,
                    dropped = state.dropped_properties,
                    "Properties outside the inferred header were dropped"
                );
            }
            summary.per_type.insert(
                label,
                TypeCounts {
                    kind: state.kind(),
                    rows: state.rows_written,
                    parts: state.next_part,
                    dropped_properties: state.dropped_properties,
                },
            );
        }
        Ok(summary)
    }

    fn flush_type(
        dir: &Path,
        _batch_size: usize,
        label: &str,
        state: &mut TypeState,
    ) -> Result<(), WriteError> {
        if state.batch.is_empty() {
            return Ok(());
        }

        // First flush for this type: infer property columns from the union
        // of keys in this batch, then write the header file once.
        if state.columns.is_none() {
            let columns = infer_columns(&state.batch);
            write_header(dir, label, state.kind(), &columns)?;
            state.columns = Some(columns);
        }
        let columns = state.columns.as_ref().unwrap();

        let part_path = dir.join(format!("{}-part{:03}.csv", label, state.next_part));
        let file = File::create(&part_path).map_err(|source| WriteError::Io {
            path: part_path.clone(),
            source,
        })?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(BufWriter::with_capacity(CSV_BUFFER_SIZE, file));

        let rows = state.batch.len() as u64;
        match &mut state.batch {
            Batch::Nodes(batch) => {
                for node in batch.drain(..) {
                    let mut record = Vec::with_capacity(columns.len() + 2);
                    record.push(node.id.clone());
                    state.dropped_properties +=
                        push_property_fields(&mut record, &node.properties, columns);
                    record.push(label.to_string());
                    writer
                        .write_record(&record)
                        .map_err(|source| WriteError::Csv {
                            path: part_path.clone(),
                            source,
                        })?;
                }
            }
            Batch::Edges(batch) => {
                for edge in batch.drain(..) {
                    let mut record = Vec::with_capacity(columns.len() + 3);
                    record.push(edge.source.clone());
                    record.push(edge.target.clone());
                    state.dropped_properties +=
                        push_property_fields(&mut record, &edge.properties, columns);
                    record.push(label.to_string());
                    writer
                        .write_record(&record)
                        .map_err(|source| WriteError::Csv {
                            path: part_path.clone(),
                            source,
                        })?;
                }
            }
        }

        writer.flush().map_err(|source| WriteError::Io {
            path: part_path.clone(),
            source,
        })?;

        state.rows_written += rows;
        state.next_part += 1;
        debug!(label, part = state.next_part - 1, rows, "Flushed batch");
        Ok(())
    }
}

/// Union of property keys across the first batch, sorted for determinism.
fn infer_columns(batch: &Batch) -> Vec<String> {
    let mut keys = BTreeSet::new();
    match batch {
        Batch::Nodes(nodes) => {
            for node in nodes {
                keys.extend(node.properties.keys().cloned());
            }
        }
        Batch::Edges(edges) => {
            for edge in edges {
                keys.extend(edge.properties.keys().cloned());
            }
        }
    }
    keys.into_iter().collect()
}

/// Append one field per column; absent properties serialize empty so the
/// column count is invariant. Returns how many properties fell outside the
/// inferred columns.
fn push_property_fields(record: &mut Vec<String>, properties: &Properties, columns: &[String]) -> u64 {
    for column in columns {
        match properties.get(column) {
            Some(value) => record.push(value.to_field()),
            None => record.push(String::new()),
        }
    }
    properties
        .keys()
        .filter(|k| !columns.contains(k))
        .count() as u64
}

fn write_header(
    dir: &Path,
    label: &str,
    kind: EntityKind,
    columns: &[String],
) -> Result<(), WriteError> {
    let path = dir.join(format!("{}-header.csv", label));
    let file = File::create(&path).map_err(|source| WriteError::Io {
        path: path.clone(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);

    let mut record: Vec<String> = Vec::with_capacity(columns.len() + 3);
    match kind {
        EntityKind::Node => {
            record.push("id:ID".to_string());
            record.extend(columns.iter().cloned());
            record.push(":LABEL".to_string());
        }
        EntityKind::Edge => {
            record.push(":START_ID".to_string());
            record.push(":END_ID".to_string());
            record.extend(columns.iter().cloned());
            record.push(":TYPE".to_string());
        }
    }
    writer
        .write_record(&record)
        .map_err(|source| WriteError::Csv {
            path: path.clone(),
            source,
        })?;
    writer.flush().map_err(|source| WriteError::Io { path, source })?;
    Ok(())
}
