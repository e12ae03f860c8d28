pub mod investigate;
pub mod mappings;
pub mod parse;
pub mod reconcile;
pub mod report;
pub mod status;

mod manifest;

use std::path::{Path, PathBuf};

pub(crate) use manifest::RunRecorder;

pub(crate) const RECONCILIATION_FILE: &str = "reconciliation.json";
pub(crate) const REPORT_FILE: &str = "discrepancy_report.csv";
pub(crate) const OCR_CACHE_DIR: &str = "ocr_cache";

pub(crate) fn case_file(case_dir: &Path, explicit: Option<PathBuf>, name: &str) -> PathBuf {
    explicit.unwrap_or_else(|| case_dir.join(name))
}
