use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::{OCR_CACHE_DIR, RECONCILIATION_FILE, REPORT_FILE};
use crate::mapping::PageMapping;
use crate::model::ReconciliationResult;
use crate::report::read_report_csv;
use crate::util::{read_json, require_case_dir};

pub fn run(args: StatusArgs) -> Result<()> {
    require_case_dir(&args.case_dir)?;
    info!(case_dir = %args.case_dir.display(), "status requested");

    let reconciliation_path = args.case_dir.join(RECONCILIATION_FILE);
    if reconciliation_path.exists() {
        let result: ReconciliationResult = read_json(&reconciliation_path)?;
        info!(
            path = %reconciliation_path.display(),
            yours_only = result.yours_only.len(),
            theirs_only = result.theirs_only.len(),
            same_dates = result.same_dates.len(),
            "reconciliation"
        );
    } else {
        warn!(path = %reconciliation_path.display(), "reconciliation missing");
    }

    let report_path = args.case_dir.join(REPORT_FILE);
    if report_path.exists() {
        let rows = read_report_csv(&report_path)?;
        info!(
            path = %report_path.display(),
            rows = rows.len(),
            manual_review = rows.iter().filter(|row| row.is_manual_review()).count(),
            "discrepancy report"
        );
    } else {
        warn!(path = %report_path.display(), "discrepancy report missing");
    }

    let mapping_files = list_files(&args.case_dir.join("mappings"), "json")?;
    if mapping_files.is_empty() {
        warn!("no page mappings built");
    }
    for path in mapping_files {
        let mapping = PageMapping::load(&path)?;
        let first = mapping.iter().next().map(|(logical, _)| logical);
        let last = mapping.iter().last().map(|(logical, _)| logical);
        info!(
            path = %path.display(),
            pages = mapping.len(),
            first_logical = first.unwrap_or_default(),
            last_logical = last.unwrap_or_default(),
            "page mapping"
        );
    }

    let ocr_dir = args.case_dir.join(OCR_CACHE_DIR);
    let ocr_pages = list_files(&ocr_dir, "txt")?;
    let ocr_bytes = ocr_pages
        .iter()
        .filter_map(|path| fs::metadata(path).ok())
        .map(|metadata| metadata.len())
        .sum::<u64>();
    info!(path = %ocr_dir.display(), pages = ocr_pages.len(), bytes = ocr_bytes, "OCR cache");

    let manifests = list_files(&args.case_dir.join("manifests"), "json")?;
    let latest = manifests
        .iter()
        .max_by_key(|path| fs::metadata(path).and_then(|metadata| metadata.modified()).ok());
    match latest {
        Some(latest) => info!(
            count = manifests.len(),
            latest = %latest.display(),
            "run manifests"
        ),
        None => warn!("no run manifests recorded"),
    }

    Ok(())
}

fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|value| value.to_str()) == Some(extension)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
