use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::model::{RunCounts, RunManifest, SourceFile};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

#[derive(Debug)]
pub struct RunRecorder {
    command: &'static str,
    run_id: String,
    started_at: String,
    sources: Vec<SourceFile>,
    warnings: Vec<String>,
}

impl RunRecorder {
    pub fn start(command: &'static str) -> Self {
        let now = Utc::now();
        Self {
            command,
            run_id: format!("{command}_run_{}", utc_compact_string(now)),
            started_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            sources: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_source(&mut self, role: &str, path: &Path) -> Result<()> {
        self.sources.push(SourceFile {
            role: role.to_string(),
            path: path.display().to_string(),
            sha256: sha256_file(path)?,
        });
        Ok(())
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(run_id = %self.run_id, "{message}");
        self.warnings.push(message);
    }

    pub fn finish(self, case_dir: &Path, output_path: &Path, counts: RunCounts) -> Result<PathBuf> {
        let manifest_path = case_dir
            .join("manifests")
            .join(format!("{}.json", self.run_id));

        let manifest = RunManifest {
            manifest_version: MANIFEST_VERSION,
            run_id: self.run_id,
            command: self.command.to_string(),
            status: "completed".to_string(),
            started_at: self.started_at,
            updated_at: now_utc_string(),
            case_dir: case_dir.display().to_string(),
            output_path: output_path.display().to_string(),
            sources: self.sources,
            counts,
            warnings: self.warnings,
        };

        write_json_pretty(&manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote run manifest");
        Ok(manifest_path)
    }
}
