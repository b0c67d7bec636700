//! Biograph: biological knowledge-graph construction pipeline
//!
//! This crate orchestrates heterogeneous biological data sources into a
//! single set of Neo4j bulk-import CSV files:
//!
//! 1. **Selection** -- Resolve adapter names and group tags against the
//!    built-in registry; unknown terms abort before anything runs
//! 2. **Acquisition** -- Each adapter obtains its raw data through an
//!    ordered fallback chain (primary endpoint, degraded endpoint, cached
//!    snapshot), with per-strategy failures logged and aggregated
//! 3. **Streaming** -- Adapters lazily parse raw payloads into nodes and
//!    edges; a run-scoped deduplicator forwards each entity at most once
//! 4. **Batched output** -- Entities flush as per-type part files with a
//!    single header file per type, tab-delimited for neo4j-admin
//! 5. **Manifest** -- Every run lands in a fresh timestamped directory with
//!    a generated import script and a JSON report whose presence marks the
//!    run complete
//!
//! # Architecture
//!
//! One adapter failing does not sink the run: configuration and acquisition
//! errors are caught at the orchestrator boundary, recorded in the report,
//! and the remaining adapters proceed. Only write failures are fatal.
//!
//! # Key Modules
//!
//! - [`adapters`] -- Data source adapters (UniProt, STRING, ChEMBL, GO)
//! - [`fallback`] -- Ordered acquisition strategies with error aggregation
//! - [`schema`] -- YAML mapping from source labels to output entity types
//! - [`dedup`] -- Run-scoped deduplication and dangling-edge accounting
//! - [`writer`] -- Batched per-type CSV output with header/part separation
//! - [`manifest`] -- Timestamped run directories and the import script
//! - [`pipeline`] -- The orchestrator tying everything together
//! - [`report`] -- Per-adapter status and run totals
//! - [`models`] -- Core data types (Node, Edge, property values)
//! - [`config`] -- Constants and the explicit run configuration
//!
//! # Example Usage
//!
//! ```bash
//! # Run every registered adapter
//! biograph run all
//!
//! # Proteins only, capped at 100 records per source
//! biograph run proteins --test-mode
//!
//! # List registered adapters and their group tags
//! biograph list
//! ```

pub mod adapters;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fallback;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod writer;
