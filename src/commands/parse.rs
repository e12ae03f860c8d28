use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{ParseArgs, TocOptions};
use crate::extract::extract_text;
use crate::toc::{
    Side, SourceParserConfig, SourceTocParser, TargetParserConfig, TargetTocParser, TocEntry,
};
use crate::util::write_json_pretty;

pub fn run(args: ParseArgs) -> Result<()> {
    let side = Side::from(args.side);
    let entries = parse_toc(side, &args.input, &args.toc)?;

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &entries)?;
            info!(path = %path.display(), entries = entries.len(), "wrote parsed TOC");
        }
        None => {
            let mut output = io::BufWriter::new(io::stdout().lock());
            serde_json::to_writer_pretty(&mut output, &entries)
                .context("failed to serialize parsed TOC")?;
            writeln!(output)?;
            output.flush()?;
        }
    }

    Ok(())
}

pub fn parse_toc(side: Side, input: &Path, options: &TocOptions) -> Result<Vec<TocEntry>> {
    let entries = match side {
        Side::Yours => {
            let text = extract_text(input, None)?;
            TargetTocParser::new(TargetParserConfig::default())?.parse_text(&text)
        }
        Side::Theirs => {
            let page_limit = u32::try_from(options.toc_pages).unwrap_or(u32::MAX);
            let text = extract_text(input, Some(page_limit))?;
            let config = SourceParserConfig {
                max_toc_pages: options.toc_pages,
                max_page_number: options.max_page_number,
                ..SourceParserConfig::default()
            };
            SourceTocParser::new(config)?.parse_text(&text)
        }
    };

    info!(
        side = side.as_str(),
        path = %input.display(),
        entries = entries.len(),
        without_pages = entries.iter().filter(|entry| !entry.has_pages()).count(),
        "parsed TOC"
    );
    Ok(entries)
}
