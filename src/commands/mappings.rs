use anyhow::Result;
use tracing::info;

use crate::cli::MappingsArgs;
use crate::commands::RunRecorder;
use crate::mapping::{
    HyperlinkReader, LINK_SCAN_PAGES, OFFSET_SCAN_PAGES, PageMapping, build_hyperlink_mapping,
    build_linear_mapping, detect_offset, mapping_path,
};
use crate::model::{MappingCounts, RunCounts};
use crate::util::{require_case_dir, require_file};

pub fn run(args: MappingsArgs) -> Result<()> {
    require_case_dir(&args.case_dir)?;
    require_file(&args.yours_pdf)?;
    require_file(&args.theirs_pdf)?;

    let mut recorder = RunRecorder::start("mappings");
    recorder.add_source("yours_pdf", &args.yours_pdf)?;
    recorder.add_source("theirs_pdf", &args.theirs_pdf)?;

    let reader = HyperlinkReader::new()?;

    let your_links = reader.read(&args.yours_pdf, OFFSET_SCAN_PAGES)?;
    let your_offset_detected = detect_offset(&your_links).is_some();
    if !your_offset_detected {
        recorder.warn(format!(
            "no page 1 link found in first {OFFSET_SCAN_PAGES} pages of {}",
            args.yours_pdf.display()
        ));
    }
    let (your_mapping, your_offset) =
        build_linear_mapping(&your_links, args.fallback_offset, args.max_logical_page)?;
    let your_path = mapping_path(&args.case_dir, &args.yours_pdf);
    your_mapping.save(&your_path)?;
    info!(
        path = %your_path.display(),
        offset = your_offset,
        pages = your_mapping.len(),
        "wrote your page mapping"
    );

    let their_path = mapping_path(&args.case_dir, &args.theirs_pdf);
    let their_mapping_reused = their_path.exists() && !args.rebuild_theirs;
    let (their_mapping, their_links) = if their_mapping_reused {
        info!(path = %their_path.display(), "reusing existing vendor page mapping");
        (PageMapping::load(&their_path)?, 0)
    } else {
        let links = reader.read(&args.theirs_pdf, LINK_SCAN_PAGES)?;
        let mapping = build_hyperlink_mapping(&links)?;
        mapping.save(&their_path)?;
        info!(
            path = %their_path.display(),
            links = links.len(),
            pages = mapping.len(),
            "wrote vendor page mapping"
        );
        (mapping, links.len())
    };

    if their_mapping.is_empty() {
        recorder.warn(format!(
            "vendor page mapping is empty for {}",
            args.theirs_pdf.display()
        ));
    }

    let counts = MappingCounts {
        your_offset,
        your_offset_detected,
        your_mapping_pages: your_mapping.len(),
        their_links,
        their_mapping_pages: their_mapping.len(),
        their_mapping_reused,
    };
    let mappings_dir = args.case_dir.join("mappings");
    recorder.finish(&args.case_dir, &mappings_dir, RunCounts::Mappings(counts))?;

    Ok(())
}
