use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::ReportArgs;
use crate::commands::{OCR_CACHE_DIR, RECONCILIATION_FILE, REPORT_FILE, RunRecorder, case_file};
use crate::fingerprint::Fingerprinter;
use crate::mapping::{PageMapping, mapping_path};
use crate::matcher::{MappedDocument, PageMatcher};
use crate::model::{ReconciliationResult, ReportCounts, RunCounts};
use crate::ocr::{OcrCache, TesseractEngine};
use crate::report::{DiscrepancyReporter, write_report_csv};
use crate::util::{read_json, require_case_dir, require_file};

pub fn run(args: ReportArgs) -> Result<()> {
    require_case_dir(&args.case_dir)?;
    require_file(&args.yours_pdf)?;
    require_file(&args.theirs_pdf)?;

    let reconciliation_path =
        case_file(&args.case_dir, args.reconciliation.clone(), RECONCILIATION_FILE);
    require_file(&reconciliation_path)?;

    let mut recorder = RunRecorder::start("report");
    recorder.add_source("reconciliation", &reconciliation_path)?;
    recorder.add_source("yours_pdf", &args.yours_pdf)?;
    recorder.add_source("theirs_pdf", &args.theirs_pdf)?;

    let result: ReconciliationResult = read_json(&reconciliation_path)?;

    let yours = load_document(&mut recorder, &args.case_dir, &args.yours_pdf)?;
    let theirs = load_document(&mut recorder, &args.case_dir, &args.theirs_pdf)?;

    let pages = OcrCache::new(
        TesseractEngine::new(&args.ocr_lang),
        args.case_dir.join(OCR_CACHE_DIR),
    );
    let fingerprinter = Fingerprinter::new()?;
    let matcher = PageMatcher::new(&yours, &theirs, &pages, &fingerprinter);
    let rows = DiscrepancyReporter::new(&matcher).build(&result);

    let output_path = case_file(&args.case_dir, args.output, REPORT_FILE);
    write_report_csv(&output_path, &rows)?;

    let manual_review_rows = rows.iter().filter(|row| row.is_manual_review()).count();
    info!(
        path = %output_path.display(),
        rows = rows.len(),
        manual_review = manual_review_rows,
        "wrote discrepancy report"
    );

    let counts = ReportCounts {
        rows: rows.len(),
        yours_only_rows: result.yours_only.len(),
        theirs_only_rows: result.theirs_only.len(),
        same_date_rows: result.same_dates.len(),
        manual_review_rows,
        your_mapping_pages: yours.mapping.len(),
        their_mapping_pages: theirs.mapping.len(),
    };
    recorder.finish(&args.case_dir, &output_path, RunCounts::Report(counts))?;

    Ok(())
}

fn load_document(
    recorder: &mut RunRecorder,
    case_dir: &Path,
    pdf: &Path,
) -> Result<MappedDocument> {
    let path = mapping_path(case_dir, pdf);
    let mapping = PageMapping::load(&path)?;
    if mapping.is_empty() {
        recorder.warn(format!(
            "no page mapping for {}; its pages will be reported as not in document",
            pdf.display()
        ));
    }
    Ok(MappedDocument::new(pdf, mapping))
}
