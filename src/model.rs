use serde::{Deserialize, Serialize};

use crate::toc::{TocDate, TocEntry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedEntry {
    pub date: TocDate,
    pub pages: Vec<u32>,
    pub header: String,
}

impl From<&TocEntry> for UnmatchedEntry {
    fn from(entry: &TocEntry) -> Self {
        Self {
            date: entry.date,
            pages: entry.pages.clone(),
            header: entry.header.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SameDateMatch {
    pub date: TocDate,
    pub your_pages: Vec<u32>,
    pub their_pages: Vec<u32>,
    pub your_header: String,
    pub their_header: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub yours_only: Vec<UnmatchedEntry>,
    pub theirs_only: Vec<UnmatchedEntry>,
    pub same_dates: Vec<SameDateMatch>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    pub role: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileCounts {
    pub your_entries: usize,
    pub their_entries: usize,
    pub your_entries_without_pages: usize,
    pub their_entries_without_pages: usize,
    pub yours_only: usize,
    pub theirs_only: usize,
    pub same_dates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportCounts {
    pub rows: usize,
    pub yours_only_rows: usize,
    pub theirs_only_rows: usize,
    pub same_date_rows: usize,
    pub manual_review_rows: usize,
    pub your_mapping_pages: usize,
    pub their_mapping_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingCounts {
    pub your_offset: u32,
    pub your_offset_detected: bool,
    pub your_mapping_pages: usize,
    pub their_links: usize,
    pub their_mapping_pages: usize,
    pub their_mapping_reused: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunCounts {
    Reconcile(ReconcileCounts),
    Mappings(MappingCounts),
    Report(ReportCounts),
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub command: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub case_dir: String,
    pub output_path: String,
    pub sources: Vec<SourceFile>,
    pub counts: RunCounts,
    pub warnings: Vec<String>,
}
