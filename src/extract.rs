use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use crate::util::{require_file, run_tool};

pub const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    PlainText,
    Pdf,
    Converted,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" | "md" => Some(DocumentFormat::PlainText),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" | "odt" | "rtf" | "doc" => Some(DocumentFormat::Converted),
            _ => None,
        }
    }
}

pub fn extract_text(path: &Path, page_limit: Option<u32>) -> Result<String> {
    require_file(path)?;
    let Some(format) = DocumentFormat::from_path(path) else {
        bail!("unsupported input format: {}", path.display());
    };

    let extracted = match format {
        DocumentFormat::PlainText => {
            return fs::read_to_string(path)
                .with_context(|| format!("failed to read text input: {}", path.display()));
        }
        DocumentFormat::Pdf => extract_pdf_pages(path, page_limit)
            .map(|pages| pages.join(&PAGE_BREAK.to_string())),
        DocumentFormat::Converted => {
            let args: [&OsStr; 3] = ["-t".as_ref(), "plain".as_ref(), path.as_os_str()];
            run_tool("pandoc", args, path)
        }
    };

    match extracted {
        Ok(text) => {
            debug!(path = %path.display(), chars = text.len(), "extracted document text");
            Ok(text)
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "text extraction failed; continuing with empty text"
            );
            Ok(String::new())
        }
    }
}

fn extract_pdf_pages(path: &Path, page_limit: Option<u32>) -> Result<Vec<String>> {
    let mut args: Vec<OsString> = vec!["-enc".into(), "UTF-8".into(), "-f".into(), "1".into()];
    if let Some(limit) = page_limit {
        args.push("-l".into());
        args.push(limit.to_string().into());
    }
    args.push(path.as_os_str().to_os_string());
    args.push("-".into());

    let raw = run_tool("pdftotext", &args, path)?;
    Ok(split_pages(&raw))
}

pub fn split_pages(raw: &str) -> Vec<String> {
    let mut pages = raw
        .split(PAGE_BREAK)
        .map(str::to_string)
        .collect::<Vec<String>>();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}
