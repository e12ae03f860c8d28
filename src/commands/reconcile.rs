use anyhow::Result;
use tracing::info;

use crate::cli::ReconcileArgs;
use crate::commands::parse::parse_toc;
use crate::commands::{RECONCILIATION_FILE, RunRecorder, case_file};
use crate::model::{ReconcileCounts, RunCounts};
use crate::reconcile::reconcile;
use crate::toc::{Side, TocEntry};
use crate::util::{require_case_dir, require_file, write_json_pretty};

pub fn run(args: ReconcileArgs) -> Result<()> {
    require_case_dir(&args.case_dir)?;
    require_file(&args.yours)?;
    require_file(&args.theirs)?;

    let mut recorder = RunRecorder::start("reconcile");
    recorder.add_source("yours_toc", &args.yours)?;
    recorder.add_source("theirs_toc", &args.theirs)?;

    let yours = parse_toc(Side::Yours, &args.yours, &args.toc)?;
    let theirs = parse_toc(Side::Theirs, &args.theirs, &args.toc)?;

    for (side, entries) in [(Side::Yours, &yours), (Side::Theirs, &theirs)] {
        if entries.is_empty() {
            recorder.warn(format!("no TOC entries parsed from {} input", side.as_str()));
        }
    }

    let result = reconcile(&yours, &theirs);

    let output_path = case_file(&args.case_dir, args.output, RECONCILIATION_FILE);
    write_json_pretty(&output_path, &result)?;
    info!(
        path = %output_path.display(),
        yours_only = result.yours_only.len(),
        theirs_only = result.theirs_only.len(),
        same_dates = result.same_dates.len(),
        "wrote reconciliation"
    );

    let counts = ReconcileCounts {
        your_entries: yours.len(),
        their_entries: theirs.len(),
        your_entries_without_pages: without_pages(&yours),
        their_entries_without_pages: without_pages(&theirs),
        yours_only: result.yours_only.len(),
        theirs_only: result.theirs_only.len(),
        same_dates: result.same_dates.len(),
    };
    recorder.finish(&args.case_dir, &output_path, RunCounts::Reconcile(counts))?;

    Ok(())
}

fn without_pages(entries: &[TocEntry]) -> usize {
    entries.iter().filter(|entry| !entry.has_pages()).count()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::cli::TocOptions;
    use crate::model::ReconciliationResult;
    use crate::util::read_json;

    const REVIEWER_TOC: &str = "\
+------------+---+---------------+---------+
| 10/06/2025 |   | Cover Letter  | 1-3     |
+------------+---+---------------+---------+
| 03/12/2024 |   | Valley Clinic | 209-210 |
+------------+---+---------------+---------+
";

    const VENDOR_TOC: &str = "03/12/24\n209-210, 300\nVALLEY CLINIC PT\n";

    #[test]
    fn reconcile_writes_result_and_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yours = dir.path().join("yours.txt");
        let theirs = dir.path().join("theirs.txt");
        fs::write(&yours, REVIEWER_TOC).expect("write yours");
        fs::write(&theirs, VENDOR_TOC).expect("write theirs");

        run(ReconcileArgs {
            case_dir: dir.path().to_path_buf(),
            yours,
            theirs,
            output: None,
            toc: TocOptions {
                toc_pages: 25,
                max_page_number: 500,
            },
        })
        .expect("reconcile");

        let result: ReconciliationResult =
            read_json(&dir.path().join(RECONCILIATION_FILE)).expect("reconciliation");
        assert_eq!(result.yours_only.len(), 1);
        assert_eq!(result.yours_only[0].header, "Cover Letter");
        assert_eq!(result.yours_only[0].pages, vec![1, 2, 3]);
        assert_eq!(result.yours_only[0].date.to_string(), "2025-10-06");
        assert_eq!(result.same_dates.len(), 1);
        assert_eq!(result.same_dates[0].their_pages, vec![209, 210, 300]);
        assert!(result.theirs_only.is_empty());

        let manifests = fs::read_dir(dir.path().join("manifests"))
            .expect("manifests dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("reconcile_run_")
            })
            .count();
        assert_eq!(manifests, 1);
    }

    #[test]
    fn missing_case_dir_aborts_before_parsing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yours = dir.path().join("yours.txt");
        fs::write(&yours, REVIEWER_TOC).expect("write yours");

        let err = run(ReconcileArgs {
            case_dir: dir.path().join("absent"),
            yours: yours.clone(),
            theirs: yours,
            output: None,
            toc: TocOptions {
                toc_pages: 25,
                max_page_number: 500,
            },
        })
        .expect_err("missing case dir");
        assert!(format!("{err:#}").contains("case directory does not exist"));
    }
}
