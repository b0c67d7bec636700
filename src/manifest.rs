//! Run Manifest: the timestamped directory holding everything one pipeline
//! run produced.
//!
//! Layout per run:
//!
//! ```text
//! <output_root>/<YYYYMMDDHHMMSS>/
//!     Protein-header.csv
//!     Protein-part000.csv
//!     ...
//!     neo4j-admin-import-call.sh
//!     run-report.json          (only written when the run completes)
//! ```
//!
//! Concurrent runs never collide because each gets a fresh timestamp
//! directory. An aborted run leaves its partial part files behind but no
//! `run-report.json`, which is how downstream importers detect
//! incompleteness.

use crate::report::RunReport;
use crate::schema::EntityKind;
use crate::writer::WriteSummary;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const IMPORT_SCRIPT_NAME: &str = "neo4j-admin-import-call.sh";
const REPORT_NAME: &str = "run-report.json";

pub struct RunManifest {
    run_id: String,
    dir: PathBuf,
}

impl RunManifest {
    /// Create a fresh run directory under `output_root`. Runs started
    /// within the same second get a numeric suffix rather than sharing a
    /// directory.
    pub fn create(output_root: &Path) -> Result<Self> {
        let stamp = Local::now().format("%Y%m%d%H%M%S").to_string();
        let mut run_id = stamp.clone();
        let mut dir = output_root.join(&run_id);
        let mut attempt = 0u32;
        while dir.exists() {
            attempt += 1;
            run_id = format!("{}_{}", stamp, attempt);
            dir = output_root.join(&run_id);
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create run directory: {}", dir.display()))?;
        info!(run_id, dir = %dir.display(), "Run manifest created");
        Ok(Self { run_id, dir })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Generate the import-invocation script listing every header/part
    /// pair. Connection parameters come from the caller; credentials are
    /// read by the script from the environment and never persisted here.
    pub fn write_import_script(&self, summary: &WriteSummary, database: &str) -> Result<PathBuf> {
        let mut script = String::new();
        script.push_str("#!/bin/bash\n");
        script.push_str("# Generated import call for this run's CSV output.\n");
        script.push_str("# Credentials are taken from NEO4J_USERNAME / NEO4J_PASSWORD.\n");
        script.push_str("set -euo pipefail\n\n");
        script.push_str("cd \"$(dirname \"$0\")\"\n\n");
        script.push_str("neo4j-admin database import full ");
        script.push_str(database);
        script.push_str(" \\\n");
        script.push_str("  --delimiter=\"\\t\" --array-delimiter=\"|\" --quote=\"'\" \\\n");

        for (label, counts) in &summary.per_type {
            let mut files = vec![format!("{}-header.csv", label)];
            for part in 0..counts.parts {
                files.push(format!("{}-part{:03}.csv", label, part));
            }
            let flag = match counts.kind {
                EntityKind::Node => "--nodes",
                EntityKind::Edge => "--relationships",
            };
            script.push_str(&format!("  {}=\"{}\" \\\n", flag, files.join(",")));
        }
        script.push_str("  --skip-bad-relationships=true --skip-duplicate-nodes=true\n");

        let path = self.dir.join(IMPORT_SCRIPT_NAME);
        fs::write(&path, &script)
            .with_context(|| format!("Failed to write import script: {}", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
        }
        info!(path = %path.display(), "Import script written");
        Ok(path)
    }

    /// Write the final report. Its presence marks the run as complete.
    pub fn write_report(&self, report: &RunReport) -> Result<PathBuf> {
        let path = self.dir.join(REPORT_NAME);
        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(path)
    }

    /// A run directory without a report is an aborted or in-flight run.
    pub fn is_complete(dir: &Path) -> bool {
        dir.join(REPORT_NAME).exists()
    }
}
