use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InvestigateArgs;
use crate::commands::OCR_CACHE_DIR;
use crate::fingerprint::{ComponentScore, Fingerprinter, MatchConfidence, SAME_DOCUMENT_POLICY};
use crate::mapping::{PageMapping, mapping_path};
use crate::matcher::{MappedDocument, PageMatcher};
use crate::ocr::{OcrCache, TesseractEngine};
use crate::toc::Side;
use crate::util::{require_case_dir, require_file};

#[derive(Debug, Clone, Serialize)]
pub struct Investigation {
    pub your_page: u32,
    pub their_page: u32,
    pub your_physical: Option<u32>,
    pub their_physical: Option<u32>,
    pub score: Option<f64>,
    pub confidence: Option<MatchConfidence>,
    pub policy: &'static str,
    pub components: Vec<ComponentScore>,
    pub verdict: String,
}

pub fn run(args: InvestigateArgs) -> Result<()> {
    require_case_dir(&args.case_dir)?;
    require_file(&args.yours_pdf)?;
    require_file(&args.theirs_pdf)?;

    let yours = MappedDocument::new(
        &args.yours_pdf,
        PageMapping::load(&mapping_path(&args.case_dir, &args.yours_pdf))?,
    );
    let theirs = MappedDocument::new(
        &args.theirs_pdf,
        PageMapping::load(&mapping_path(&args.case_dir, &args.theirs_pdf))?,
    );

    let pages = OcrCache::new(
        TesseractEngine::new(&args.ocr_lang),
        args.case_dir.join(OCR_CACHE_DIR),
    );
    let fingerprinter = Fingerprinter::new()?;
    let matcher = PageMatcher::new(&yours, &theirs, &pages, &fingerprinter);

    let investigation = investigate(&matcher, args.your_page, args.their_page);
    info!(
        your_page = investigation.your_page,
        their_page = investigation.their_page,
        verdict = %investigation.verdict,
        "investigated page pair"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &investigation)
            .context("failed to serialize investigation")?;
        writeln!(output)?;
    } else {
        write_text(&mut output, &investigation)?;
    }
    output.flush()?;

    Ok(())
}

pub fn investigate(matcher: &PageMatcher<'_>, your_page: u32, their_page: u32) -> Investigation {
    let yours = matcher.document(Side::Yours);
    let theirs = matcher.document(Side::Theirs);
    let your_physical = yours.mapping.get(your_page);
    let their_physical = theirs.mapping.get(their_page);

    let mut investigation = Investigation {
        your_page,
        their_page,
        your_physical,
        their_physical,
        score: None,
        confidence: None,
        policy: SAME_DOCUMENT_POLICY.name,
        components: Vec::new(),
        verdict: String::new(),
    };

    let (Some(your_physical), Some(their_physical)) = (your_physical, their_physical) else {
        investigation.verdict = match your_physical {
            None => format!("YOUR PAGE {your_page} NOT IN DOCUMENT"),
            Some(_) => format!("THEIR PAGE {their_page} NOT IN DOCUMENT"),
        };
        return investigation;
    };

    let components =
        matcher.explain_physical(&yours.path, your_physical, &theirs.path, their_physical);
    let score = matcher.score_physical(&yours.path, your_physical, &theirs.path, their_physical);
    let confidence = SAME_DOCUMENT_POLICY.band(score);

    investigation.verdict = same_document_verdict(confidence).to_string();
    investigation.score = Some(score);
    investigation.confidence = Some(confidence);
    investigation.components = components;
    investigation
}

pub fn same_document_verdict(confidence: MatchConfidence) -> &'static str {
    match confidence {
        MatchConfidence::Strong => "SAME DOCUMENT",
        MatchConfidence::Likely => "LIKELY SAME DOCUMENT",
        MatchConfidence::Weak => "POSSIBLY RELATED",
        MatchConfidence::NoMatch => "DIFFERENT DOCUMENTS",
    }
}

fn write_text(output: &mut impl Write, investigation: &Investigation) -> Result<()> {
    let physical = |page: Option<u32>| {
        page.map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string())
    };

    writeln!(
        output,
        "Your page {} (pdf page {}) vs their page {} (pdf page {})",
        investigation.your_page,
        physical(investigation.your_physical),
        investigation.their_page,
        physical(investigation.their_physical),
    )?;
    for component in &investigation.components {
        writeln!(
            output,
            "\t{:?}\tvalue={:.3}\tweight={:.1}",
            component.component, component.value, component.weight
        )?;
    }
    if let Some(score) = investigation.score {
        writeln!(output, "Score: {score:.3}")?;
    }
    writeln!(output, "Verdict: {}", investigation.verdict)?;
    Ok(())
}
