//! Schema mapping: adapter-emitted labels to output entity types.
//!
//! The mapping file is an external, declarative YAML document consumed
//! read-only at orchestrator start. Entities whose label has no entry are
//! skipped with a counted `SchemaError`, never a crash.

use crate::error::SchemaError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Edge,
}

/// One mapping entry: the output label used for file names and `:LABEL` /
/// `:TYPE` columns, plus an optional property allow-list.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaEntry {
    pub label: String,
    pub kind: EntityKind,
    /// When present, only these properties are written; others are dropped
    /// with a count. Absent means all properties pass through.
    #[serde(default)]
    pub properties: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct SchemaMap {
    entries: HashMap<String, SchemaEntry>,
}

impl SchemaMap {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema mapping: {}", path.display()))?;
        Self::from_yaml(&raw)
            .with_context(|| format!("Failed to parse schema mapping: {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let entries: HashMap<String, SchemaEntry> =
            serde_yaml::from_str(raw).context("Invalid schema YAML")?;

        // An output label hosts exactly one kind; part files and the
        // import call cannot mix nodes and edges under one type.
        let mut kinds: HashMap<String, EntityKind> = HashMap::new();
        for entry in entries.values() {
            if let Some(kind) = kinds.insert(entry.label.clone(), entry.kind) {
                if kind != entry.kind {
                    anyhow::bail!(
                        "output label '{}' is mapped as both a node and an edge type",
                        entry.label
                    );
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn resolve(&self, source_label: &str) -> Result<&SchemaEntry, SchemaError> {
        self.entries.get(source_label).ok_or_else(|| SchemaError {
            label: source_label.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
