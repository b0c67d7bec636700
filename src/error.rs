//! Error taxonomy for the pipeline.
//!
//! Adapter-level failures (`ConfigError`, `AcquireError`) are caught at the
//! orchestrator boundary and recorded in the run report; the run continues
//! with the next adapter. `WriteError` is fatal for the whole run because
//! partially flushed batches cannot be safely continued. `SchemaError` is
//! recoverable per entity (skip and count).

use std::path::PathBuf;
use thiserror::Error;

/// Invalid adapter options. Fatal for that adapter only.
#[derive(Debug, Error)]
#[error("invalid adapter configuration: {0}")]
pub struct ConfigError(pub String);

/// A single acquisition strategy failed. Only acquisition-layer failures
/// (network, parsing, authentication, cache misses) belong here; logic
/// errors should panic instead of being folded into the fallback chain.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("authentication error: {0}")]
    Auth(String),
    #[error("cache miss: {0}")]
    CacheMiss(String),
    #[error("offline mode, network strategy skipped")]
    Offline,
}

/// Every fallback strategy for a source was exhausted. Carries each
/// attempted strategy with its error so the report can show what was tried.
#[derive(Debug, Error)]
#[error("all acquisition strategies failed for {adapter}: [{}]", format_attempts(.attempts))]
pub struct AcquireError {
    pub adapter: String,
    /// (strategy name, error description) in attempt order.
    pub attempts: Vec<(String, String)>,
}

fn format_attempts(attempts: &[(String, String)]) -> String {
    attempts
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

/// An entity label with no entry in the schema mapping. Recoverable by
/// skipping the entity.
#[derive(Debug, Error)]
#[error("no schema mapping for label '{label}'")]
pub struct SchemaError {
    pub label: String,
}

/// Filesystem failure while flushing output. Fatal for the whole run.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv serialization failed for {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Unknown adapter name or group tag at selection time. The run aborts
/// before any adapter executes.
#[derive(Debug, Error)]
#[error("unknown adapter or group '{name}' (available: {available})")]
pub struct SelectionError {
    pub name: String,
    pub available: String,
}

/// Adapter-scoped failures the orchestrator records without aborting.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Acquire(#[from] AcquireError),
}
